//! Driver for `xmlrpc` objects.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use log::{debug, warn};
use xmlrpc::{Request, Value};

use crate::config::DumpConfig;
use crate::drivers::Driver;
use crate::error::Result;
use crate::models::{DumpObject, XmlRpcSpec};
use crate::transport::Transport;

/// Probes a set of methods on an XML-RPC endpoint and writes every response,
/// pretty-printed, into one file at `target/<host>/xmlrpc/<to_file>`.
///
/// The endpoint is spoken to directly over HTTP; unlike the other drivers
/// this one does not go through the object's transport. Endpoint failures
/// are recorded in the output file, not raised: an RPC service being down is
/// a finding, not a reason to abort the run.
pub struct XmlRpcDriver {
    server: String,
    methods: Vec<String>,
    /// `target/<host>/xmlrpc/<to_file>`.
    target_path: PathBuf,
}

impl XmlRpcDriver {
    pub fn new(object: &DumpObject, spec: XmlRpcSpec, config: &DumpConfig) -> Self {
        let host = object.host.report_name();
        let target_path = config
            .target()
            .join(&host)
            .join("xmlrpc")
            .join(spec.to_file.trim_start_matches('/'));
        Self {
            server: spec.server,
            methods: spec.methods,
            target_path,
        }
    }

    /// Methods the endpoint advertises, when it supports introspection.
    /// `None` means we could not tell and every configured method is probed.
    fn list_methods(&self) -> Option<HashSet<String>> {
        match Request::new("system.listMethods").call_url(self.server.as_str()) {
            Ok(Value::Array(values)) => Some(
                values
                    .iter()
                    .filter_map(|value| value.as_str().map(str::to_owned))
                    .collect(),
            ),
            Ok(other) => {
                debug!(
                    "Unexpected system.listMethods response from {}: {:?}",
                    self.server, other
                );
                None
            }
            Err(err) => {
                warn!("Cannot list methods on {}: {}", self.server, err);
                None
            }
        }
    }
}

impl Driver for XmlRpcDriver {
    fn snapshot(&self, _transport: &dyn Transport) -> Result<()> {
        if let Some(parent) = self.target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let available = self.list_methods();
        let mut file = fs::File::create(&self.target_path)?;
        for method in &self.methods {
            debug!("Probing XML-RPC method {} on {}", method, self.server);
            let response = match &available {
                Some(methods) if !methods.contains(method) => {
                    "no such method on remote server".to_string()
                }
                _ => match Request::new(method).call_url(self.server.as_str()) {
                    Ok(value) => format!("{:#?}", value),
                    Err(err) => format!("request failed: {}", err),
                },
            };
            writeln!(file, "===== {} =====\n{}\n", method, response)?;
        }
        Ok(())
    }
}
