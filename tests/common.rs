use gumdrop::Options;
use httpmock::MockServer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use tweetswarm::prelude::*;

/// Not all functions are used by all tests, so we enable allow(dead_code) to avoid
/// compiler warnings during testing.

/// The following options are configured by default, if not set to a custom value:
///  --host <mock-server>
///  --users 1
///  --hatch-rate 1
///  --run-time 1
///  --seed 1
#[allow(dead_code)]
pub fn build_configuration(server: &MockServer, custom: Vec<&str>) -> SwarmConfiguration {
    // Start with an empty configuration.
    let mut configuration: Vec<&str> = vec![];
    // Declare server_url here no matter what, so its lifetime is sufficient when needed.
    let server_url = server.base_url();

    // Merge in all custom options first.
    configuration.extend_from_slice(&custom);

    // Default to using mock server if not otherwise configured.
    if !configuration.contains(&"--host") {
        configuration.extend_from_slice(&["--host", &server_url]);
    }

    // Default to testing with 1 user if not otherwise configured.
    if !configuration.contains(&"--users") {
        configuration.extend_from_slice(&["--users", "1"]);
    }

    // Default to hatch 1 user per second if not otherwise configured.
    if !configuration.contains(&"--hatch-rate") {
        configuration.extend_from_slice(&["--hatch-rate", "1"]);
    }

    // Default to running for 1 second if not otherwise configured.
    if !configuration.contains(&"--run-time") {
        configuration.extend_from_slice(&["--run-time", "1"]);
    }

    // Default to repeatable payloads if not otherwise configured.
    if !configuration.contains(&"--seed") {
        configuration.extend_from_slice(&["--seed", "1"]);
    }

    // Parse these options to generate a SwarmConfiguration.
    SwarmConfiguration::parse_args_default(&configuration)
        .expect("failed to parse options and generate a configuration")
}

/// Collects diagnostic lines instead of printing them.
#[derive(Default)]
pub struct CapturedDiagnostics {
    lines: Mutex<Vec<String>>,
}
impl CapturedDiagnostics {
    #[allow(dead_code)]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}
impl DiagnosticWriter for CapturedDiagnostics {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Build a single user talking to the mock server, for invoking tasks directly.
#[allow(dead_code)]
pub fn build_user(server: &MockServer, diagnostics: Arc<CapturedDiagnostics>) -> SwarmUser {
    let client = ReqwestClient::new(
        Url::parse(&server.base_url()).expect("mock server has a valid base url"),
        Duration::from_secs(5),
    )
    .expect("failed to build client");
    SwarmUser::new(
        0,
        Arc::new(client),
        StdRng::seed_from_u64(202200129),
        diagnostics,
    )
}
