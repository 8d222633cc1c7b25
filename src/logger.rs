//! Diagnostic output written by tasks.
//!
//! Regular logging goes through the `log` macros and is configured with `-v`, `-q`,
//! `-g` and `--log-file`. Diagnostics are different: they are the lines a task prints
//! about an unexpected response, and they always reach standard out no matter how the
//! logger is configured.
//!
//! The destination is a [`DiagnosticWriter`], shared by every
//! [`SwarmUser`](../swarm/struct.SwarmUser.html). Replace the default
//! [`StdoutDiagnostics`] with
//! [`SwarmAttack::set_diagnostics`](../struct.SwarmAttack.html#method.set_diagnostics)
//! to capture them elsewhere, for example in tests:
//!
//! ```rust
//! use std::sync::Mutex;
//! use tweetswarm::logger::DiagnosticWriter;
//!
//! #[derive(Default)]
//! struct Captured(Mutex<Vec<String>>);
//!
//! impl DiagnosticWriter for Captured {
//!     fn write_line(&self, line: &str) {
//!         self.0.lock().unwrap().push(line.to_string());
//!     }
//! }
//!
//! let captured = Captured::default();
//! captured.write_line("Error: 500 - server error");
//! assert_eq!(captured.0.lock().unwrap().len(), 1);
//! ```

use std::io::{self, Write};

/// A destination for diagnostic lines.
pub trait DiagnosticWriter: Send + Sync {
    /// Write one line. Implementations add the line terminator.
    fn write_line(&self, line: &str);
}

/// Writes diagnostics to standard out.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutDiagnostics;

impl DiagnosticWriter for StdoutDiagnostics {
    fn write_line(&self, line: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = writeln!(handle, "{}", line) {
            warn!("failed to write diagnostic to stdout: {}", e);
        }
    }
}
