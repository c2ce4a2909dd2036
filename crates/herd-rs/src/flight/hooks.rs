//! Per-subscriber callbacks.
//!
//! Every submission carries its own [`RequestHooks`]. A follower that
//! attaches to a running flight keeps its own hooks and receives the
//! leader's outcome through them.
//!
//! Delivery order for one subscriber:
//!
//! | Outcome | Calls |
//! |---------|-------|
//! | Success | `on_progress(100)`, `on_success`, `on_result`, `on_end` |
//! | Failure | `on_progress(100)` (response only), `on_error`, `on_error_end`, `on_end` |
//! | Preempted | `on_end` |
//! | Rejected | `on_error`, `on_error_end`, `on_end` |
//!
//! `on_start` fires once per accepted submission, before any of these.
//! `on_error` may also fire once per retried attempt before the terminal
//! calls.

use crate::flight::outcome::Response;
use std::sync::Arc;

/// Callbacks for one submission. All methods default to no-ops.
pub trait RequestHooks: Send + Sync {
    /// The submission passed validation.
    fn on_start(&self) {}

    /// Completion percentage; currently only `100` on response.
    fn on_progress(&self, _percent: u8) {}

    /// The flight got a 200. Followed by `on_result`.
    fn on_success(&self) {}

    /// Per-attempt retry notices and the final failure message.
    fn on_error(&self, _message: &str) {}

    /// Fires once, after the last `on_error` of a failed flight.
    fn on_error_end(&self, _detail: &str) {}

    /// Always the last call for a submission.
    fn on_end(&self) {}

    /// The successful response payload.
    fn on_result(&self, _response: &Response) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl RequestHooks for NoHooks {}

type Callback = Arc<dyn Fn() + Send + Sync>;
type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;
type TextCallback = Arc<dyn Fn(&str) + Send + Sync>;
type ResultCallback = Arc<dyn Fn(&Response) + Send + Sync>;

/// Closure-backed [`RequestHooks`].
///
/// ```ignore
/// let hooks = CallbackSet::new()
///     .with_result(|resp| println!("{}", resp.body))
///     .with_error(|msg| eprintln!("{msg}"));
/// ```
#[derive(Clone, Default)]
#[must_use]
pub struct CallbackSet {
    start: Option<Callback>,
    progress: Option<ProgressCallback>,
    success: Option<Callback>,
    error: Option<TextCallback>,
    error_end: Option<TextCallback>,
    end: Option<Callback>,
    result: Option<ResultCallback>,
}

impl CallbackSet {
    /// A set with no callbacks registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the submission is accepted.
    pub fn with_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Arc::new(f));
        self
    }

    /// Called with `100` once a response arrives.
    pub fn with_progress(mut self, f: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    /// Called before the result callback on a 200 response.
    pub fn with_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.success = Some(Arc::new(f));
        self
    }

    /// Called for each retried attempt and for the final failure.
    pub fn with_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    /// Called once with diagnostic detail after the final error.
    pub fn with_error_end(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error_end = Some(Arc::new(f));
        self
    }

    /// Called last, whatever the outcome.
    pub fn with_end(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.end = Some(Arc::new(f));
        self
    }

    /// Called with the successful response.
    pub fn with_result(mut self, f: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.result = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSet")
            .field("start", &self.start.is_some())
            .field("progress", &self.progress.is_some())
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("error_end", &self.error_end.is_some())
            .field("end", &self.end.is_some())
            .field("result", &self.result.is_some())
            .finish()
    }
}

impl RequestHooks for CallbackSet {
    fn on_start(&self) {
        if let Some(f) = &self.start {
            f();
        }
    }

    fn on_progress(&self, percent: u8) {
        if let Some(f) = &self.progress {
            f(percent);
        }
    }

    fn on_success(&self) {
        if let Some(f) = &self.success {
            f();
        }
    }

    fn on_error(&self, message: &str) {
        if let Some(f) = &self.error {
            f(message);
        }
    }

    fn on_error_end(&self, detail: &str) {
        if let Some(f) = &self.error_end {
            f(detail);
        }
    }

    fn on_end(&self) {
        if let Some(f) = &self.end {
            f();
        }
    }

    fn on_result(&self, response: &Response) {
        if let Some(f) = &self.result {
            f(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn empty_callback_set_is_silent() {
        let hooks = CallbackSet::new();
        hooks.on_start();
        hooks.on_error("x");
        hooks.on_result(&Response {
            code: 200,
            body: String::new(),
        });
        hooks.on_end();
    }

    #[test]
    fn callbacks_fire_with_arguments() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());

        let hooks = CallbackSet::new()
            .with_progress(move |p| l1.lock().unwrap().push(format!("progress:{p}")))
            .with_error(move |m| l2.lock().unwrap().push(format!("error:{m}")))
            .with_result(move |r| l3.lock().unwrap().push(format!("result:{}", r.body)))
            .with_end(move || l4.lock().unwrap().push("end".into()));

        hooks.on_progress(100);
        hooks.on_error("bad");
        hooks.on_result(&Response {
            code: 200,
            body: "ok".into(),
        });
        hooks.on_success();
        hooks.on_end();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["progress:100", "error:bad", "result:ok", "end"]
        );
    }

    #[test]
    fn debug_lists_registered_callbacks() {
        let hooks = CallbackSet::new().with_end(|| {});
        let dbg = format!("{hooks:?}");
        assert!(dbg.contains("end: true"));
        assert!(dbg.contains("start: false"));
    }
}
