//! Config file to provisioned displays

use dmseat::config::Config;
use dmseat::runtime::Runtime;
use dmseat::ServerKind;

const CONFIG: &str = r#"
[seat]
minimum_display_number = 5
xserver_command = "Xorg"
vt_start = 2

[[local_seat]]
name = "seat0"

[[remote_session]]
id = 11
address = "10.0.0.5"
display_number = 7
cookie = "00112233445566778899aabbccddeeff"

[[remote_session]]
id = 12
address = "10.0.0.6"
display_number = 3
cookie = "ffeeddccbbaa99887766554433221100"
"#;

#[test]
fn config_file_provisions_every_seat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = Config::load_from_file(&path).unwrap();
    let mut runtime = Runtime::from_config(&config);
    assert_eq!(runtime.seats().len(), 3);

    let summary = runtime.provision_all(1);
    assert_eq!(summary.provisioned, 3);
    assert!(summary.failed.is_empty());

    let mut names: Vec<(String, String)> = runtime
        .displays()
        .iter()
        .map(|d| (d.seat.clone(), d.display.connection_name()))
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            ("remote-11".to_string(), "10.0.0.5:7".to_string()),
            ("remote-12".to_string(), "10.0.0.6:3".to_string()),
            ("seat0".to_string(), ":5".to_string()),
        ]
    );

    let local = runtime
        .displays()
        .iter()
        .find(|d| d.display.kind() == ServerKind::Local)
        .unwrap();
    let argv = local
        .display
        .command_line(&dir.path().join("seat0.auth"))
        .unwrap();
    assert_eq!(argv[0], "Xorg");
    assert!(argv.contains(&"vt2".to_string()));

    let written = runtime.write_authorities(&dir.path().join("auth")).unwrap();
    assert_eq!(written.len(), 3);
    for path in &written {
        assert!(!std::fs::read(path).unwrap().is_empty());
    }

    runtime.shutdown();
    assert!(runtime.allocator().in_use().is_empty());
}
