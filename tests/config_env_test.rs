use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wf::{ExecMode, Settings};

// Environment and working directory are process-wide, so the layering checks
// share one test.
#[test]
fn test_layered_config() {
    let temp_dir = TempDir::new().unwrap();
    let original_dir = env::current_dir().unwrap();

    // Workspace config is found from a nested directory
    let config_dir = temp_dir.path().join(".wf");
    let nested = temp_dir.path().join("src").join("deep");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        config_dir.join("settings.toml"),
        r#"
[exec]
mode = "shell"
shell = "/bin/dash"

[logging]
default = "info"
"#,
    )
    .unwrap();

    env::set_current_dir(&nested).unwrap();

    let settings = Settings::load(None).unwrap();
    assert_eq!(settings.exec.mode, ExecMode::Shell);
    assert_eq!(settings.exec.shell, PathBuf::from("/bin/dash"));

    unsafe {
        // Double underscore separates nested levels
        env::set_var("WF_EXEC__SHELL", "/bin/bash");
        env::set_var("WF_LOGGING__DEFAULT", "debug");
    }

    let settings = Settings::load(None).unwrap();

    // Environment overrides the file
    assert_eq!(settings.exec.shell, PathBuf::from("/bin/bash"));
    assert_eq!(settings.logging.default, "debug");
    // File value used when no env var
    assert_eq!(settings.exec.mode, ExecMode::Shell);

    // An explicit file replaces the workspace one
    let explicit = temp_dir.path().join("other.toml");
    fs::write(&explicit, "[exec]\nmode = \"exec\"\n").unwrap();
    let settings = Settings::load(Some(&explicit)).unwrap();
    assert_eq!(settings.exec.mode, ExecMode::Exec);
    assert_eq!(settings.exec.shell, PathBuf::from("/bin/bash"));

    // A relative explicit file is not searched for in parent directories
    assert!(Settings::load(Some(Path::new("other.toml"))).is_err());

    unsafe {
        env::remove_var("WF_EXEC__SHELL");
        env::remove_var("WF_LOGGING__DEFAULT");
    }

    env::set_current_dir(original_dir).unwrap();
}
