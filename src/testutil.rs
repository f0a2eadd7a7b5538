#![cfg(test)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use crate::env::EnvMap;
use crate::shell::{CompletedProcess, Invocation, ProcessHost, Redirect};

pub const FAKE_CWD: &str = "/fake/cwd";

pub fn env_map(pairs: &[(&str, &str)]) -> EnvMap {
    pairs
        .iter()
        .map(|(k, v)| (OsString::from(k), OsString::from(v)))
        .collect()
}

enum Scripted {
    Exit(i32, Vec<u8>),
    Error(io::ErrorKind),
}

/// Records every call and replays scripted results instead of touching the OS.
pub struct FakeHost {
    programs_present: bool,
    environment: EnvMap,
    captures: RefCell<VecDeque<Scripted>>,
    spawn_result: Result<i32, io::ErrorKind>,
    probe_log: RefCell<Vec<String>>,
    capture_log: RefCell<Vec<Vec<String>>>,
    spawn_log: RefCell<Vec<Invocation>>,
    environment_reads: Cell<usize>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            programs_present: true,
            environment: EnvMap::new(),
            captures: RefCell::new(VecDeque::new()),
            spawn_result: Ok(0),
            probe_log: RefCell::new(Vec::new()),
            capture_log: RefCell::new(Vec::new()),
            spawn_log: RefCell::new(Vec::new()),
            environment_reads: Cell::new(0),
        }
    }

    pub fn without_programs(mut self) -> Self {
        self.programs_present = false;
        self
    }

    pub fn with_environment(mut self, pairs: &[(&str, &str)]) -> Self {
        self.environment = env_map(pairs);
        self
    }

    pub fn with_capture(self, code: i32, stdout: &str) -> Self {
        self.with_capture_bytes(code, stdout.as_bytes().to_vec())
    }

    pub fn with_capture_bytes(self, code: i32, stdout: Vec<u8>) -> Self {
        self.captures
            .borrow_mut()
            .push_back(Scripted::Exit(code, stdout));
        self
    }

    pub fn with_capture_error(self, kind: io::ErrorKind) -> Self {
        self.captures.borrow_mut().push_back(Scripted::Error(kind));
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.spawn_result = Ok(code);
        self
    }

    pub fn with_spawn_error(mut self, kind: io::ErrorKind) -> Self {
        self.spawn_result = Err(kind);
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.probe_log.borrow().clone()
    }

    pub fn captures(&self) -> Vec<Vec<String>> {
        self.capture_log.borrow().clone()
    }

    pub fn spawns(&self) -> Vec<Invocation> {
        self.spawn_log.borrow().clone()
    }

    pub fn environment_reads(&self) -> usize {
        self.environment_reads.get()
    }
}

impl ProcessHost for FakeHost {
    fn resolvable(&self, program: &str) -> bool {
        self.probe_log.borrow_mut().push(program.to_string());
        self.programs_present
    }

    fn environment(&self) -> EnvMap {
        self.environment_reads.set(self.environment_reads.get() + 1);
        self.environment.clone()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(PathBuf::from(FAKE_CWD))
    }

    fn capture_stdout(&self, argv: &[&str]) -> io::Result<CompletedProcess> {
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        self.capture_log.borrow_mut().push(argv.clone());

        match self.captures.borrow_mut().pop_front() {
            Some(Scripted::Exit(code, stdout)) => Ok(CompletedProcess {
                argv,
                code,
                stdout: Some(stdout),
                stderr: None,
            }),
            Some(Scripted::Error(kind)) => Err(io::Error::from(kind)),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "no scripted capture left",
            )),
        }
    }

    fn spawn(&self, invocation: &Invocation) -> io::Result<CompletedProcess> {
        self.spawn_log.borrow_mut().push(invocation.clone());

        let code = self.spawn_result.map_err(io::Error::from)?;
        let captured = |r: Redirect| (r == Redirect::Capture).then(Vec::new);
        Ok(CompletedProcess {
            argv: invocation.argv.clone(),
            code,
            stdout: captured(invocation.stdout),
            stderr: captured(invocation.stderr),
        })
    }
}
