use std::cell::{Cell, RefCell};

/// Sink for user-facing diagnostics. Components report errors as they find
/// them; the driver inspects the flags between pipeline phases to decide
/// whether to keep going.
#[derive(Default)]
pub struct Diagnostics {
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
    reports: RefCell<Vec<String>>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    /// Static error with no token context: `[line L] Error: message`.
    pub fn error(&self, line: u64, message: &str) {
        self.report(line, "", message);
    }

    /// Static error at a source location: `[line L] Error at 'x': message`.
    pub fn report(&self, line: u64, origin: &str, message: &str) {
        self.had_error.set(true);
        self.emit(format!("[line {}] Error{}: {}", line, origin, message));
    }

    /// Runtime error: the message on one line, the offending line below it.
    pub fn runtime_error(&self, line: u64, message: &str) {
        self.had_runtime_error.set(true);
        self.emit(format!("{}\n[line {}]", message, line));
    }

    fn emit(&self, report: String) {
        println!("{}", report);
        self.reports.borrow_mut().push(report);
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Clears the static error flag so a REPL session survives bad input.
    pub fn reset(&self) {
        self.had_error.set(false);
        self.reports.borrow_mut().clear();
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.borrow().clone()
    }
}
