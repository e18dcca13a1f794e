//! Test doubles shared by driver, queue and manager tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::error::{DumpError, Result};
use crate::models::{CommandOut, DumpObject};
use crate::transport::{Transport, TransportFactory};

/// Shared call log, so tests can assert on dispatch order across objects.
pub type CallLog = Rc<RefCell<Vec<String>>>;

/// Scripted transport: records every call, either succeeding with a preset
/// stdout or failing with `UnreachableHost`.
pub struct MockTransport {
    host: String,
    unreachable: bool,
    stdout: String,
    log: CallLog,
}

impl MockTransport {
    pub fn healthy(host: &str, stdout: &str) -> Self {
        Self {
            host: host.to_string(),
            unreachable: false,
            stdout: stdout.to_string(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn unreachable(host: &str) -> Self {
        Self {
            host: host.to_string(),
            unreachable: true,
            stdout: String::new(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Commands issued through this transport, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|entry| entry.strip_prefix("run ").map(str::to_owned))
            .collect()
    }
}

impl Transport for MockTransport {
    fn run(&self, command: &str) -> Result<CommandOut> {
        if self.unreachable {
            self.log.borrow_mut().push(format!("fail {}", self.host));
            return Err(DumpError::UnreachableHost {
                host: self.host.clone(),
            });
        }
        self.log.borrow_mut().push(format!("run {}", command));
        Ok(CommandOut {
            return_code: Some(0),
            stdout: self.stdout.clone(),
            stderr: String::new(),
        })
    }

    fn fetch(&self, path: &Path, dest_dir: &Path) -> Result<()> {
        if self.unreachable {
            self.log.borrow_mut().push(format!("fail {}", self.host));
            return Err(DumpError::UnreachableHost {
                host: self.host.clone(),
            });
        }
        self.log
            .borrow_mut()
            .push(format!("fetch {} {}", self.host, path.display()));
        // Materialize an empty copy so callers that post-process the fetched
        // path (renames, exclusion cleanup) have something to work on.
        fs::create_dir_all(dest_dir)?;
        if let Some(name) = path.file_name() {
            fs::write(dest_dir.join(name), b"")?;
        }
        Ok(())
    }
}

/// Factory producing [`MockTransport`]s, with per-host failure scripting.
pub struct MockFactory {
    /// Host address -> remaining dial-outs that should fail
    /// (`u32::MAX` means the host never comes back).
    unreachable: RefCell<HashMap<String, u32>>,
    pub log: CallLog,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            unreachable: RefCell::new(HashMap::new()),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn always_unreachable(self, host: &str) -> Self {
        self.unreachable
            .borrow_mut()
            .insert(host.to_string(), u32::MAX);
        self
    }

    pub fn unreachable_times(self, host: &str, times: u32) -> Self {
        self.unreachable
            .borrow_mut()
            .insert(host.to_string(), times);
        self
    }
}

impl TransportFactory for MockFactory {
    fn for_object(&self, object: &DumpObject) -> Result<Box<dyn Transport>> {
        let host = object
            .network_address()
            .unwrap_or("local")
            .to_string();
        let mut down = false;
        if let Some(remaining) = self.unreachable.borrow_mut().get_mut(&host) {
            if *remaining > 0 {
                down = true;
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
            }
        }
        let transport = if down {
            MockTransport::unreachable(&host)
        } else {
            MockTransport::healthy(&host, "mock output\n")
        };
        Ok(Box::new(transport.with_log(self.log.clone())))
    }
}
