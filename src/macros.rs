//! `profile_scope!`/`profile_function!` (spec §6), mirroring the original's
//! `PROFILE_SCOPE(name)`/`PROFILE_FUNCTION()` macros: register once per call
//! site, cache the token locally, then enter/leave for the scope's lifetime.

/// Registers (once, via a call-site-local cache) and enters `$name`,
/// returning an RAII guard that calls `leave` when it drops.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {{
        thread_local! {
            static __SCOPEPROF_TOKEN: std::cell::Cell<Option<$crate::name::FunctionName>> =
                const { std::cell::Cell::new(None) };
        }
        let token = __SCOPEPROF_TOKEN.with(|cell| {
            if let Some(token) = cell.get() {
                token
            } else {
                let token = $crate::instrumentation::register($name);
                cell.set(Some(token));
                token
            }
        });
        $crate::instrumentation::ScopeGuard::new(token)
    }};
}

/// Like [`profile_scope!`] but uses the enclosing function's name, taken via
/// the standard `type_name_of_val`-on-a-local-closure trick (there is no
/// `__func__` in Rust).
#[macro_export]
macro_rules! profile_function {
    () => {{
        fn __scopeprof_marker() {}
        fn __scopeprof_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let mut name = __scopeprof_name_of(__scopeprof_marker);
        name = name.strip_suffix("::__scopeprof_marker").unwrap_or(name);
        $crate::profile_scope!(name)
    }};
}

#[cfg(test)]
mod tests {
    use crate::instrumentation::with_call_stack;

    fn instrumented_leaf() {
        let _guard = crate::profile_function!();
    }

    #[test]
    fn profile_function_registers_under_its_own_name() {
        instrumented_leaf();
        with_call_stack(|stack| assert_eq!(stack.depth(), 0));
        let names = crate::registry::global_names();
        assert!(names.iter().any(|n| n.as_str().contains("instrumented_leaf")));
    }

    #[test]
    fn profile_scope_reuses_cached_token_per_call_site() {
        fn call_twice() {
            let _guard = crate::profile_scope!("macros_test_scope");
        }
        call_twice();
        call_twice();
        with_call_stack(|stack| assert_eq!(stack.depth(), 0));
    }
}
