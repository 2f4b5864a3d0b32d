//! End-to-end generation: job description in, job bundle out.

use std::fs;
use std::path::Path;

use validar::config::ValidationConfig;
use validar::dataset::catalog::StaticCatalog;
use validar::dataset::DatasetCache;
use validar::environment::{EnvProbe, Environment};
use validar::error::Result;
use validar::shell::CommandRunner;
use validar::validation::{
    create_merge_script, create_plotting_scripts, Alignment, GenerationPhase, GeneratorContext,
    KindRegistry, ValidationInstance, MERGE_SCRIPT_NAME,
};

struct NoProbe;

impl EnvProbe for NoProbe {
    fn probe(&self, root: &Path) -> Result<Environment> {
        panic!("unexpected environment probe of {}", root.display());
    }
}

struct NoShell;

impl CommandRunner for NoShell {
    fn run(&self, command: &str) -> Result<String> {
        panic!("unexpected shell command: {command}");
    }
}

fn catalog() -> StaticCatalog {
    StaticCatalog::from_yaml(
        r#"
datasets:
  "/Cosmics/Run2011A-v1/RAW":
    magnetic_field: MagneticField_38T
    data_kind: data
    runs:
      - { run_number: 160404, start: "2011-03-14 00:00:00" }
      - { run_number: 160939, start: "2011-03-22 00:00:00" }
  "/RelValZMM/Spring11-v1/GEN-SIM-RECO":
    magnetic_field: MagneticField_38T
    data_kind: mc
"#,
    )
    .unwrap()
}

fn job_description(jobmode: &str, parallel_jobs: usize) -> ValidationConfig {
    ValidationConfig::from_yaml(&format!(
        r#"
general:
  workdir: /tmp/validation
  jobmode: "{jobmode}"
"alignment:ideal":
  title: ideal geometry
  globaltag: IDEAL_V1
"offline:cosmics":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 10000
  parallelJobs: "{parallel_jobs}"
"#,
    ))
    .unwrap()
}

struct Workbench {
    ambient: Environment,
    _home: tempfile::TempDir,
    out: tempfile::TempDir,
}

fn workbench() -> Workbench {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir_all(home.path().join("src/Alignment/OfflineValidation")).unwrap();
    let ambient = Environment {
        base: home.path().to_path_buf(),
        scram_arch: "slc7_amd64_gcc700".to_owned(),
        release_base: home.path().join("release"),
    };
    Workbench { ambient, _home: home, out: tempfile::tempdir().unwrap() }
}

fn build_instance(
    config: &ValidationConfig,
    bench: &Workbench,
    cache: &mut DatasetCache,
    name: &str,
) -> ValidationInstance {
    let registry = KindRegistry::builtin(&bench.ambient.base).unwrap();
    let kind = registry.get("offline").unwrap();
    let alignment = Alignment::from_config(config, "ideal").unwrap();
    let backend = catalog();
    let mut ctx = GeneratorContext {
        config,
        ambient: &bench.ambient,
        probe: &NoProbe,
        runner: &NoShell,
        backend: &backend,
        cache,
    };
    ValidationInstance::new(name, alignment, kind, &mut ctx).unwrap()
}

#[test]
fn test_three_job_fan_out_renders_indexed_configurations() {
    let bench = workbench();
    let config = job_description("interactive", 3);
    let mut cache = DatasetCache::new();
    let mut instance = build_instance(&config, &bench, &mut cache, "cosmics");

    let logical = instance.create_configuration(bench.out.path()).unwrap().to_vec();
    assert_eq!(
        logical,
        vec![bench.out.path().join("TkAlOfflineValidation.cosmics.ideal_cfg.py")]
    );

    for index in 0..3 {
        let body = fs::read_to_string(
            bench
                .out
                .path()
                .join(format!("TkAlOfflineValidation.cosmics.ideal_cfg_{index}.py")),
        )
        .unwrap();
        assert!(body.contains(&format!("AlignmentValidation_cosmics_ideal_{index}.root")));
        assert!(body.contains("globaltag = \"IDEAL_V1\""));
        assert!(body.contains("MagneticField_38T_cff"));
        assert!(!body.contains(".oO["), "unresolved placeholder in:\n{body}");
    }
}

#[cfg(unix)]
#[test]
fn test_scripts_reference_their_configuration_and_are_executable() {
    use std::os::unix::fs::PermissionsExt;

    let bench = workbench();
    let config = job_description("interactive", 3);
    let mut cache = DatasetCache::new();
    let mut instance = build_instance(&config, &bench, &mut cache, "cosmics");

    instance.create_configuration(bench.out.path()).unwrap();
    instance.create_script(bench.out.path()).unwrap();

    for index in 0..3 {
        let script = bench
            .out
            .path()
            .join(format!("TkAlOfflineValidation.cosmics.ideal_{index}.sh"));
        let body = fs::read_to_string(&script).unwrap();
        assert!(body.contains(&format!("ideal_cfg_{index}.py")));
        assert!(!body.contains(".oO["), "unresolved placeholder in:\n{body}");
        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_generation_phases_enforce_their_order() {
    let bench = workbench();
    let config = job_description("interactive", 1);
    let mut cache = DatasetCache::new();
    let mut instance = build_instance(&config, &bench, &mut cache, "cosmics");

    // Script generation references the configuration file list.
    assert!(instance.create_script(bench.out.path()).is_err());
    instance.create_configuration(bench.out.path()).unwrap();
    assert!(instance.create_configuration(bench.out.path()).is_err());
    instance.create_script(bench.out.path()).unwrap();
    assert_eq!(instance.phase(), GenerationPhase::ScriptGenerated);
}

#[test]
fn test_shared_dataset_descriptor_is_cached_across_instances() {
    let bench = workbench();
    let config = ValidationConfig::from_yaml(
        r#"
general:
  workdir: /tmp/validation
"alignment:ideal":
  globaltag: IDEAL_V1
"offline:first":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 10000
"offline:second":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 20000
"#,
    )
    .unwrap();
    let mut cache = DatasetCache::new();

    let first = build_instance(&config, &bench, &mut cache, "first");
    let second = build_instance(&config, &bench, &mut cache, "second");

    let a = &first.dataset.as_ref().unwrap().descriptor;
    let b = &second.dataset.as_ref().unwrap().descriptor;
    assert!(std::rc::Rc::ptr_eq(a, b));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_merge_script_tracks_the_maximum_exit_code() {
    let bench = workbench();
    let config = job_description("interactive", 2);
    let mut cache = DatasetCache::new();
    let mut instance = build_instance(&config, &bench, &mut cache, "cosmics");
    instance.create_configuration(bench.out.path()).unwrap();
    instance.create_script(bench.out.path()).unwrap();

    let mut instances = vec![instance];
    let merge = create_merge_script(bench.out.path(), &mut instances).unwrap();
    assert_eq!(merge, bench.out.path().join(MERGE_SCRIPT_NAME));

    let body = fs::read_to_string(&merge).unwrap();
    assert!(body.contains("hadd -f"));
    assert!(body.contains("AlignmentValidation_cosmics_ideal_0.root"));
    assert!(body.contains("AlignmentValidation_cosmics_ideal_1.root"));
    assert!(body.contains("if [[ ${tmpMergeRetCode} -gt ${mergeRetCode} ]]; then"));
    assert!(body.contains("exit ${mergeRetCode}"));
    assert!(!body.contains(".oO["), "unresolved placeholder in:\n{body}");

    // The plot runner for the offline macro is part of the merge step.
    assert!(body.contains("TkAlExtendedOfflineValidation.C"));
}

#[test]
fn test_plotting_macro_is_shared_by_a_kind_group() {
    let bench = workbench();
    let config = ValidationConfig::from_yaml(
        r#"
general:
  workdir: /tmp/validation
"alignment:ideal":
  globaltag: IDEAL_V1
"offline:first":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 10000
"offline:second":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 20000
"#,
    )
    .unwrap();
    let mut cache = DatasetCache::new();
    let mut instances = vec![
        build_instance(&config, &bench, &mut cache, "first"),
        build_instance(&config, &bench, &mut cache, "second"),
    ];
    for instance in &mut instances {
        instance.create_configuration(bench.out.path()).unwrap();
        instance.create_script(bench.out.path()).unwrap();
    }

    let macros = create_plotting_scripts(bench.out.path(), &mut instances).unwrap();
    assert_eq!(macros, vec![bench.out.path().join("TkAlExtendedOfflineValidation.C")]);

    let body = fs::read_to_string(&macros[0]).unwrap();
    // One shared macro carries both instances' fragments.
    assert!(body.contains("AlignmentValidation_first_ideal.root"));
    assert!(body.contains("AlignmentValidation_second_ideal.root"));
    assert!(!body.contains(".oO["), "unresolved placeholder in:\n{body}");
}

#[test]
fn test_crab_descriptor_carries_queue_and_job_count() {
    let bench = workbench();
    let config = ValidationConfig::from_yaml(
        r#"
general:
  workdir: /tmp/validation
  jobmode: "crab, -q cmscaf1nd"
"alignment:ideal":
  globaltag: IDEAL_V1
"offline:cosmics":
  dataset: /Cosmics/Run2011A-v1/RAW
  maxevents: 10000
  parallelJobs: "1"
  firstRun: "160404"
"#,
    )
    .unwrap();
    let mut cache = DatasetCache::new();
    let mut instance = build_instance(&config, &bench, &mut cache, "cosmics");
    instance.create_configuration(bench.out.path()).unwrap();
    instance.create_script(bench.out.path()).unwrap();
    instance.create_crab_cfg(bench.out.path()).unwrap();

    let body = fs::read_to_string(
        bench
            .out
            .path()
            .join("crab.TkAlOfflineValidation.cosmics.ideal.cfg"),
    )
    .unwrap();
    assert!(body.contains("queue = cmscaf1nd"));
    assert!(body.contains("number_of_jobs = 1"));
    assert!(body.contains("total_number_of_lumis = -1"));
    assert!(body.contains("datasetpath = /Cosmics/Run2011A-v1/RAW"));
    assert!(!body.contains(".oO["), "unresolved placeholder in:\n{body}");

    // The grid binding resolved the half-open range from the catalog.
    assert_eq!(instance.general["runRange"], "160404-160939");
}

#[test]
fn test_compare_strings_rewrite_storage_paths() {
    let bench = workbench();
    let config = job_description("interactive", 1);
    let mut cache = DatasetCache::new();
    let instance = build_instance(&config, &bench, &mut cache, "cosmics");

    let plain = instance.compare_strings(true).unwrap();
    let file = &plain["DEFAULT"];
    assert!(file.starts_with("root://eoscms.cern.ch//eos/cms/store/caf/user/"));

    let decorated = instance.compare_string_for("cosmics", false).unwrap();
    assert!(decorated.contains("=ideal geometry|1|1"));
}
