use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
    let map: HashMap<String, OsString> = pairs.iter().map(|(k, v)| ((*k).to_owned(), OsString::from(*v))).collect();
    move |key| map.get(key).cloned()
}

#[cfg(unix)]
fn non_utf8() -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(vec![0x38, 0xff])
}

#[test]
fn defaults_when_nothing_set() {
    let config = GateConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, GateConfig::default());
    assert_eq!(config.max_redirects, 8);
}

#[test]
fn routes_file_is_read() {
    let config = GateConfig::from_lookup(lookup(&[(ROUTES_FILE_VAR, "/etc/vigilert/routes.yaml")])).unwrap();
    assert_eq!(config.routes_file, Some(PathBuf::from("/etc/vigilert/routes.yaml")));
}

#[test]
fn blank_routes_file_means_builtin() {
    let config = GateConfig::from_lookup(lookup(&[(ROUTES_FILE_VAR, "  ")])).unwrap();
    assert!(config.routes_file.is_none());
}

#[test]
fn max_redirects_parsed() {
    let config = GateConfig::from_lookup(lookup(&[(MAX_REDIRECTS_VAR, " 3 ")])).unwrap();
    assert_eq!(config.max_redirects, 3);
}

#[test]
fn invalid_max_redirects_rejected() {
    let err = GateConfig::from_lookup(lookup(&[(MAX_REDIRECTS_VAR, "many")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref var, ref value } if var == MAX_REDIRECTS_VAR && value == "many"));
}

#[test]
fn load_routes_defaults_to_builtin_table() {
    let table = GateConfig::default().load_routes().unwrap();
    assert_eq!(table.routes().len(), RouteTable::vigilert().routes().len());
}

#[test]
fn load_routes_reports_missing_file() {
    let config = GateConfig { routes_file: Some(PathBuf::from("/nonexistent/routes.yaml")), max_redirects: 8 };
    assert!(matches!(config.load_routes(), Err(RouteError::Read { .. })));
}

#[cfg(unix)]
#[test]
fn non_utf8_max_redirects_is_invalid_not_default() {
    let err = GateConfig::from_lookup(|key: &str| (key == MAX_REDIRECTS_VAR).then(non_utf8)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref var, ref value } if var == MAX_REDIRECTS_VAR && value == "8\u{fffd}"));
}

#[cfg(unix)]
#[test]
fn non_utf8_routes_file_is_kept() {
    let config = GateConfig::from_lookup(|key: &str| (key == ROUTES_FILE_VAR).then(non_utf8)).unwrap();
    assert_eq!(config.routes_file, Some(PathBuf::from(non_utf8())));
}
