//! Markup of the generated IDE files.
//!
//! Every template renders against a context with a single key: `project`
//! for per-project files, `solution` for the solution manifest. Lines that
//! end up blank after rendering are dropped by the emitter.

/// Project descriptor (`.vcxproj`).
pub const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Project DefaultTargets="Build" ToolsVersion="${xml:project.tools_version}" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
	<ItemGroup Label="ProjectConfigurations">
		${for b in project.rows}
			<ProjectConfiguration Include="${xml:b.label}|${xml:b.ide_platform}">
				<Configuration>${xml:b.label}</Configuration>
				<Platform>${xml:b.ide_platform}</Platform>
			</ProjectConfiguration>
		${endfor}
	</ItemGroup>
	<PropertyGroup Label="Globals">
		<ProjectGuid>{${project.id}}</ProjectGuid>
		<Keyword>MakefileProj</Keyword>
		<ProjectName>${xml:project.name}</ProjectName>
		${for key, value in project.globals}
			<${key}>${xml:value}</${key}>
		${endfor}
	</PropertyGroup>
	<Import Project="$(VCTargetsPath)\Microsoft.Cpp.Default.props" />
	${for b in project.rows}
		<PropertyGroup Condition="'$(Configuration)|$(Platform)'=='${xml:b.label}|${xml:b.ide_platform}'" Label="Configuration">
			<ConfigurationType>Makefile</ConfigurationType>
			<OutDir>${xml:b.output_dir}</OutDir>
			<BinDir>${xml:b.bin_dir}</BinDir>
			<PlatformToolset>${xml:b.toolset}</PlatformToolset>
		</PropertyGroup>
	${endfor}
	<Import Project="$(VCTargetsPath)\Microsoft.Cpp.props" />
	<ImportGroup Label="ExtensionSettings" />
	<ImportGroup Label="PropertySheets">
		<Import Project="$(MSBuildProjectDirectory)\$(MSBuildProjectName).vcxproj.default.props" Condition="exists('$(MSBuildProjectDirectory)\$(MSBuildProjectName).vcxproj.default.props')" />
		<Import Project="$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props" Condition="exists('$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props')" Label="LocalAppDataPlatform" />
	</ImportGroup>
	${for b in project.rows}
		<PropertyGroup Condition="'$(Configuration)|$(Platform)'=='${xml:b.label}|${xml:b.ide_platform}'">
			<NMakeBuildCommandLine>${xml:b.build_command}</NMakeBuildCommandLine>
			<NMakeReBuildCommandLine>${xml:b.rebuild_command}</NMakeReBuildCommandLine>
			<NMakeCleanCommandLine>${xml:b.clean_command}</NMakeCleanCommandLine>
			<NMakeIncludeSearchPath>${xml:b.include_path}</NMakeIncludeSearchPath>
			<NMakePreprocessorDefinitions>${xml:b.define_list};$(NMakePreprocessorDefinitions)</NMakePreprocessorDefinitions>
			<IncludePath>${xml:b.include_path}</IncludePath>
			${if b.output_file}
				<NMakeOutput>${xml:b.output_file}</NMakeOutput>
				<ExecutablePath>${xml:b.output_file}</ExecutablePath>
			${else}
				<NMakeOutput>not_supported</NMakeOutput>
				<ExecutablePath>not_supported</ExecutablePath>
			${endif}
			${if b.output_name}
				<TargetName>${xml:b.output_name}</TargetName>
			${endif}
		</PropertyGroup>
	${endfor}
	<ItemGroup>
		${for x in project.items}
			<${x.kind} Include="${xml:x.path}" />
		${endfor}
	</ItemGroup>
	<Import Project="$(VCTargetsPath)\Microsoft.Cpp.targets" />
	<ImportGroup Label="ExtensionTargets" />
</Project>
"#;

/// Filter file (`.vcxproj.filters`).
pub const FILTERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Project ToolsVersion="4.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
	<ItemGroup>
		${for x in project.items}
			<${x.kind} Include="${xml:x.path}">
			${if x.filter != '.'}
				<Filter>${xml:x.filter}</Filter>
			${endif}
			</${x.kind}>
		${endfor}
	</ItemGroup>
	<ItemGroup>
		${for f in project.folders}
			<Filter Include="${xml:f.name}">
				<UniqueIdentifier>{${f.id}}</UniqueIdentifier>
			</Filter>
		${endfor}
	</ItemGroup>
</Project>
"#;

/// User file (`.vcxproj.user`) with debugger settings.
pub const USER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Project ToolsVersion="4.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
	${for b in project.rows}
		${if b.debug_command}
			<PropertyGroup Condition="'$(Configuration)|$(Platform)'=='${xml:b.label}|${xml:b.ide_platform}'">
				<LocalDebuggerCommand>${xml:b.debug_command}</LocalDebuggerCommand>
				<LocalDebuggerCommandArguments>${xml:b.debug_arguments}</LocalDebuggerCommandArguments>
				<LocalDebuggerWorkingDirectory>$(OutDir)</LocalDebuggerWorkingDirectory>
				<DebuggerFlavor>WindowsLocalDebugger</DebuggerFlavor>
			</PropertyGroup>
		${endif}
	${endfor}
</Project>
"#;

/// Property sheet (`.vcxproj.default.props`).
pub const PROPERTY_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Project DefaultTargets="Build" ToolsVersion="4.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
	${for b in project.rows}
		${if b.output_name}
			<PropertyGroup Condition="'$(Configuration)|$(Platform)'=='${xml:b.label}|${xml:b.ide_platform}'">
				<SLN_ExProjectTool>${b.external}</SLN_ExProjectTool>
				<SLN_TargetFile>${xml:b.debug_path}</SLN_TargetFile>
				<TargetPath Condition="'$(SLN_TargetFile)' != ''">$(SLN_TargetFile)</TargetPath>
				<LocalDebuggerCommand>${xml:b.debug_command}</LocalDebuggerCommand>
				${if b.debug_arguments}
					<LocalDebuggerCommandArguments>${xml:b.debug_arguments}</LocalDebuggerCommandArguments>
				${endif}
				<LocalDebuggerWorkingDirectory>$(OutDir)</LocalDebuggerWorkingDirectory>
			</PropertyGroup>
		${endif}
		<ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='${xml:b.label}|${xml:b.ide_platform}'">
			<ClCompile>
				<SLN_TargetSolution>${xml:project.solution}</SLN_TargetSolution>
				${if b.target_spec}
					<SLN_TargetSpec>${xml:b.target_spec}</SLN_TargetSpec>
				${endif}
				${if b.target_config}
					<SLN_TargetConfig>${xml:b.target_config}</SLN_TargetConfig>
				${endif}
				${if b.output_name}
					<SLN_TargetName>${xml:b.output_name}</SLN_TargetName>
				${endif}
				${if b.output_file}
					<SLN_TargetFile>${xml:b.output_file}</SLN_TargetFile>
				${endif}
				${if b.include_path}
					<SLN_IncludeDirectories>${xml:b.include_path}</SLN_IncludeDirectories>
				${endif}
				${if b.define_list}
					<SLN_PreprocessorDefinitions>${xml:b.define_list}</SLN_PreprocessorDefinitions>
				${endif}
				${if b.output_dir}
					<SLN_OutputDir>${xml:b.output_dir}</SLN_OutputDir>
				${endif}
				${if b.c_flags}
					<SLN_CompilerOptions_C>${xml:b.c_flags}</SLN_CompilerOptions_C>
				${endif}
				${if b.cxx_flags}
					<SLN_CompilerOptions_CXX>${xml:b.cxx_flags}</SLN_CompilerOptions_CXX>
				${endif}
				${if b.link_flags}
					<SLN_LinkerOptions>${xml:b.link_flags}</SLN_LinkerOptions>
				${endif}
				<SLN_BuildCommandLine>${xml:b.build_command}</SLN_BuildCommandLine>
				<SLN_RebuildCommandLine>${xml:b.rebuild_command}</SLN_RebuildCommandLine>
				<SLN_CleanCommandLine>${xml:b.clean_command}</SLN_CleanCommandLine>
			</ClCompile>
		</ItemDefinitionGroup>
	${endfor}
	<ItemDefinitionGroup />
	<ItemGroup />
</Project>
"#;

/// Solution manifest (`.sln`).
pub const SOLUTION: &str = r#"Microsoft Visual Studio Solution File, Format Version ${solution.format_version}
# Visual Studio ${solution.display_version}
${for p in solution.projects}
Project("{${p.type_id}}") = "${p.name}", "${p.title}", "{${p.id}}"
	${if p.depends_on_build_all}
	ProjectSection(ProjectDependencies) = postProject
		{${solution.build_all}} = {${solution.build_all}}
	EndProjectSection
	${endif}
EndProject
${endfor}
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		${for c in solution.configurations}
		${c.label}|${c.platform} = ${c.label}|${c.platform}
		${endfor}
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		${for p in solution.projects}
		${for b in p.rows}
		{${p.id}}.${b.label}|${b.platform}.ActiveCfg = ${b.label}|${b.platform}
		${if b.build}
		{${p.id}}.${b.label}|${b.platform}.Build.0 = ${b.label}|${b.platform}
		${endif}
		${if b.deploy}
		{${p.id}}.${b.label}|${b.platform}.Deploy.0 = ${b.label}|${b.platform}
		${endif}
		${endfor}
		${endfor}
	EndGlobalSection
	GlobalSection(SolutionProperties) = preSolution
		HideSolutionNode = FALSE
	EndGlobalSection
	GlobalSection(NestedProjects) = preSolution
		${for n in solution.nested}
		{${n.child}} = {${n.parent}}
		${endfor}
	EndGlobalSection
EndGlobal
"#;
