//! The generic middleware "onion" composition primitive (spec §4.3, §9).
//!
//! A middleware wraps the *next* callable in the chain and returns a new
//! callable with the same shape. Given middlewares registered in order
//! `[M1, M2, M3]` and a base callable `B`, [`compose`] builds
//! `M1(M2(M3(B)))` — `M1` is outermost, so its pre-logic runs first and its
//! post-logic unwinds last.
//!
//! The four hook shapes named in the spec (client request, client response,
//! server job, server action) are genuinely different signatures, so this
//! module deliberately stays generic over `In`/`Out` rather than exposing a
//! single `Middleware` trait object usable everywhere (spec §9: "do not try
//! to unify them behind one interface"). `pysoa-client` and `pysoa-server`
//! each instantiate [`Middleware`] and [`compose`] with their own concrete
//! `In`/`Out` pairs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, `Send` future, used as the return type of every onion stage.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The callable type every middleware hook wraps and returns: an
/// `Arc`-shared async function from `In` to `Out`.
pub type NextFn<In, Out> = Arc<dyn Fn(In) -> BoxFuture<'static, Out> + Send + Sync>;

/// One layer of the onion for a hook with request type `In` and result type
/// `Out`. Implementations may inspect or mutate `In` before calling `next`,
/// and may inspect or mutate the resulting `Out` before returning it.
///
/// A wrapper that needs to abort the chain should have `next` simply not be
/// called, or propagate a failure through `Out` (e.g. `Out = Result<T, E>`);
/// the composition itself has no opinion on error types.
pub trait Middleware<In, Out>: Send + Sync
where
    In: 'static,
    Out: 'static,
{
    /// Wrap `next` with this middleware's pre/post logic.
    fn wrap(&self, next: NextFn<In, Out>) -> NextFn<In, Out>;
}

/// Fold a middleware chain (in registration order) around `base`.
///
/// `chain[0]` ends up outermost: its logic runs first on the way in and
/// last on the way out, matching spec §4.3 and the ordering property tested
/// in spec §8 (scenario 8, the middleware onion trace).
pub fn compose<In, Out>(
    chain: &[Arc<dyn Middleware<In, Out>>],
    base: NextFn<In, Out>,
) -> NextFn<In, Out>
where
    In: 'static,
    Out: 'static,
{
    chain.iter().rev().fold(base, |acc, mw| mw.wrap(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Tracer {
        name: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware<i32, i32> for Tracer {
        fn wrap(&self, next: NextFn<i32, i32>) -> NextFn<i32, i32> {
            let name = self.name;
            let trace = self.trace.clone();
            Arc::new(move |input| {
                let trace = trace.clone();
                let next = next.clone();
                Box::pin(async move {
                    trace.lock().push(format!("{name}-in"));
                    let result = next(input).await;
                    trace.lock().push(format!("{name}-out"));
                    result
                })
            })
        }
    }

    #[tokio::test]
    async fn onion_ordering_matches_spec_scenario_8() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let base_trace = trace.clone();
        let base: NextFn<i32, i32> = Arc::new(move |input| {
            let trace = base_trace.clone();
            Box::pin(async move {
                trace.lock().push("base".to_string());
                input
            })
        });

        let chain: Vec<Arc<dyn Middleware<i32, i32>>> = vec![
            Arc::new(Tracer {
                name: "X",
                trace: trace.clone(),
            }),
            Arc::new(Tracer {
                name: "Y",
                trace: trace.clone(),
            }),
            Arc::new(Tracer {
                name: "Z",
                trace: trace.clone(),
            }),
        ];

        let wrapped = compose(&chain, base);
        let _ = wrapped(1).await;

        let observed = trace.lock().clone();
        assert_eq!(
            observed,
            vec!["X-in", "Y-in", "Z-in", "base", "Z-out", "Y-out", "X-out"]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    struct Tracer {
        index: usize,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware<i32, i32> for Tracer {
        fn wrap(&self, next: NextFn<i32, i32>) -> NextFn<i32, i32> {
            let index = self.index;
            let trace = self.trace.clone();
            Arc::new(move |input| {
                let trace = trace.clone();
                let next = next.clone();
                Box::pin(async move {
                    trace.lock().push(format!("{index}-in"));
                    let result = next(input).await;
                    trace.lock().push(format!("{index}-out"));
                    result
                })
            })
        }
    }

    proptest! {
        /// For any chain length, entry order is a strict nesting: the trace is
        /// always `0-in, 1-in, ..., N-in, base, N-out, ..., 1-out, 0-out`
        /// (spec §8 scenario 8, generalized beyond the fixed 3-entry example).
        #[test]
        fn onion_trace_is_always_a_palindromic_nest(chain_len in 0usize..8) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let trace = Arc::new(Mutex::new(Vec::new()));

            let base_trace = trace.clone();
            let base: NextFn<i32, i32> = Arc::new(move |input| {
                let trace = base_trace.clone();
                Box::pin(async move {
                    trace.lock().push("base".to_string());
                    input
                })
            });

            let chain: Vec<Arc<dyn Middleware<i32, i32>>> = (0..chain_len)
                .map(|index| {
                    Arc::new(Tracer {
                        index,
                        trace: trace.clone(),
                    }) as Arc<dyn Middleware<i32, i32>>
                })
                .collect();

            let wrapped = compose(&chain, base);
            rt.block_on(wrapped(1));

            let observed = trace.lock().clone();
            let mut expected: Vec<String> = (0..chain_len).map(|i| format!("{i}-in")).collect();
            expected.push("base".to_string());
            expected.extend((0..chain_len).rev().map(|i| format!("{i}-out")));

            prop_assert_eq!(observed, expected);
        }
    }
}
