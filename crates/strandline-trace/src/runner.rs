//! Assertion test runs.
//!
//! Every function tagged `assert` that takes no inputs is executed from an
//! empty stack. It passes when the result stack holds exactly one truthy
//! value. An executor error is a failure of that test, not of the run.

use indexmap::IndexMap;
use serde::Serialize;
use strandline_core::{FunctionId, ModuleStore, ModuleUrl};

use crate::error::TraceError;
use crate::tracer::{Executor, SavingTracer};
use crate::value::Value;

/// Result of one assertion.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub function: FunctionId,
    pub ok: bool,
    /// Final stack, empty when execution failed.
    pub result: Vec<Value>,
    /// Everything the execution did, nested calls included.
    pub trace: SavingTracer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleReport {
    pub ok: bool,
    pub functions: IndexMap<FunctionId, TestOutcome>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestReport {
    pub ok: bool,
    pub modules: IndexMap<ModuleUrl, ModuleReport>,
}

impl TestReport {
    pub fn failures(&self) -> impl Iterator<Item = (&ModuleUrl, &TestOutcome)> {
        self.modules.iter().flat_map(|(url, report)| {
            report
                .functions
                .values()
                .filter(|outcome| !outcome.ok)
                .map(move |outcome| (url, outcome))
        })
    }
}

/// Runs one function from an empty stack.
pub fn run_test(executor: &dyn Executor, module: &ModuleUrl, function: &FunctionId) -> TestOutcome {
    let mut trace = SavingTracer::new();
    match executor.execute(module, function, Vec::new(), &mut trace) {
        Ok(result) => {
            let ok = result.len() == 1 && result[0].is_truthy();
            TestOutcome {
                function: function.clone(),
                ok,
                result,
                trace,
                error: None,
            }
        }
        Err(err) => {
            tracing::warn!("assertion {} in {} failed to run: {}", function, module, err);
            TestOutcome {
                function: function.clone(),
                ok: false,
                result: Vec::new(),
                trace,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Runs every runnable assertion in `urls`, in module then function order.
pub fn run_assertions(
    store: &ModuleStore,
    executor: &dyn Executor,
    urls: &[ModuleUrl],
) -> Result<TestReport, TraceError> {
    let mut report = TestReport {
        ok: true,
        modules: IndexMap::new(),
    };
    for url in urls {
        let module = store.module(url)?;
        let mut module_report = ModuleReport {
            ok: true,
            functions: IndexMap::new(),
        };
        for (id, function) in &module.functions {
            if !function.is_runnable_assertion() {
                continue;
            }
            let outcome = run_test(executor, url, id);
            module_report.ok &= outcome.ok;
            module_report.functions.insert(id.clone(), outcome);
        }
        tracing::debug!(
            "ran {} assertions in {} (ok: {})",
            module_report.functions.len(),
            url,
            module_report.ok
        );
        report.ok &= module_report.ok;
        report.modules.insert(url.clone(), module_report);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceEntry;
    use crate::tracer::Tracer;
    use strandline_core::{Function, Module, OpId, StackEffect};

    /// Returns a canned stack per function id; `boom` fails.
    struct Canned;

    impl Executor for Canned {
        fn execute(
            &self,
            _module: &ModuleUrl,
            function: &FunctionId,
            _stack: Vec<Value>,
            tracer: &mut dyn Tracer,
        ) -> Result<Vec<Value>, TraceError> {
            tracer.record(0, TraceEntry::new(OpId(1), Vec::new()));
            match function.as_str() {
                "pass" => Ok(vec![Value::Bool(true)]),
                "falsy" => Ok(vec![Value::Number(0.0)]),
                "two" => Ok(vec![Value::Bool(true), Value::Bool(true)]),
                _ => Err(TraceError::Executor {
                    message: "boom".into(),
                }),
            }
        }
    }

    fn store() -> (ModuleStore, ModuleUrl) {
        let url = ModuleUrl::new("mem://tests");
        let module = Module::new("tests", ModuleUrl::new("mem://core"))
            .with_function("pass", Function::new("pass").with_tags(["assert"]))
            .with_function("falsy", Function::new("falsy").with_tags(["assert"]))
            .with_function("two", Function::new("two").with_tags(["assert"]))
            .with_function("boom", Function::new("boom").with_tags(["assert"]))
            .with_function("helper", Function::new("helper"))
            .with_function(
                "needs_input",
                Function::interface("needs_input", StackEffect::new(1, 1)).with_tags(["assert"]),
            );
        let mut store = ModuleStore::new();
        store.insert(url.clone(), module);
        (store, url)
    }

    #[test]
    fn single_truthy_result_passes() {
        let outcome = run_test(&Canned, &ModuleUrl::new("mem://tests"), &FunctionId::new("pass"));
        assert!(outcome.ok);
        assert_eq!(outcome.trace.len(), 1);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn runs_only_runnable_assertions() {
        let (store, url) = store();
        let report = run_assertions(&store, &Canned, &[url.clone()]).unwrap();
        assert!(!report.ok);

        let module = &report.modules[&url];
        let ran: Vec<_> = module.functions.keys().map(|id| id.as_str()).collect();
        assert_eq!(ran, vec!["pass", "falsy", "two", "boom"]);
        assert!(module.functions[&FunctionId::new("pass")].ok);
        assert!(!module.functions[&FunctionId::new("falsy")].ok);
        assert!(!module.functions[&FunctionId::new("two")].ok);

        let boom = &module.functions[&FunctionId::new("boom")];
        assert!(!boom.ok);
        assert_eq!(boom.error.as_deref(), Some("execution failed: boom"));
        assert_eq!(report.failures().count(), 3);
    }

    #[test]
    fn missing_module_is_an_error() {
        let (store, _) = store();
        let err = run_assertions(&store, &Canned, &[ModuleUrl::new("mem://nope")]).unwrap_err();
        assert!(matches!(err, TraceError::Core(_)));
    }
}
