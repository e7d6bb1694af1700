//! `AsyncResult` 状态机与回调契约测试。
//!
//! # 教案级导览
//!
//! - **Why**：结果容器是所有桥接能力的地基，回调丢失、重复触发或终态被覆盖都会在上层表现为
//!   “永远挂起”或“幽灵完成”，必须在最小场景下先行锁定。
//! - **How**：以真实线程构造“注册与完成”的竞争路径，配合原子计数器核对每个回调的触发次数；
//!   组合子测试直接读取 `try_outcome`，不依赖任何运行时。
//! - **What**：覆盖先注册/后注册、并发注册、重复完成、`then`/`exceptionally`/`map` 链式组合、
//!   处理器失败与 panic、观察者 panic 隔离、不可取消结果。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lumen_core::{AsyncResult, CompletionError, ResultError, ResultState};
use tracing_test::traced_test;

fn counting_observer(
    counter: &Arc<AtomicUsize>,
) -> impl FnOnce(Result<u32, ResultError>) + Send + 'static {
    let counter = Arc::clone(counter);
    move |outcome| {
        assert_eq!(outcome, Ok(7), "观察者必须收到完成值");
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// ## 先注册后完成
///
/// - **意图 (Why)**：注册先于完成的回调必须在完成时恰好触发一次。
/// - **契约 (What)**：完成前计数为 0，完成后为 1，再次完成不会重复触发。
#[test]
fn callbacks_registered_before_completion_fire_once() {
    let result = AsyncResult::<u32>::new();
    let counter = Arc::new(AtomicUsize::new(0));
    result.observe(counting_observer(&counter));

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    result.complete(7).expect("首次完成必须成功");
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    assert!(result.complete(8).is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1, "重复完成不得再次触发回调");
}

/// ## 完成后注册在注册线程立即触发
#[test]
fn late_registration_fires_on_registering_thread() {
    let result = AsyncResult::from_value(7_u32);
    let caller = thread::current().id();
    let (tx, rx) = std::sync::mpsc::channel();

    result.observe(move |outcome| {
        tx.send((thread::current().id(), outcome)).expect("接收端仍然存活");
    });

    let (fired_on, outcome) = rx.try_recv().expect("终态下注册必须同步触发");
    assert_eq!(fired_on, caller);
    assert_eq!(outcome, Ok(7));
}

/// ## 并发注册与完成
///
/// - **意图 (Why)**：注册线程与完成线程交错时，每个回调要么进入待触发列表，要么看到终态后立即执行。
/// - **逻辑 (How)**：8 个注册线程与 1 个完成线程在 `Barrier` 处同时起跑，重复 64 轮。
/// - **契约 (What)**：每轮结束时计数恰好等于注册线程数，既无丢失也无重复。
#[test]
fn concurrent_registration_and_completion_never_lose_callbacks() {
    const OBSERVERS: usize = 8;

    for _ in 0..64 {
        let result = AsyncResult::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(OBSERVERS + 1));

        let mut handles = Vec::new();
        for _ in 0..OBSERVERS {
            let result = result.clone();
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                result.observe(counting_observer(&counter));
            }));
        }

        let completer = {
            let result = result.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                result.complete(7).expect("只有一个完成方");
            })
        };

        for handle in handles {
            handle.join().expect("注册线程不应 panic");
        }
        completer.join().expect("完成线程不应 panic");
        assert_eq!(counter.load(Ordering::SeqCst), OBSERVERS);
    }
}

/// ## 重复完成返回状态违例
#[test]
fn completing_a_settled_result_reports_the_existing_state() {
    let result = AsyncResult::<u32>::new();
    result.complete(1).expect("首次完成必须成功");

    assert_eq!(
        result.complete_exceptionally(ResultError::msg("late")),
        Err(CompletionError::AlreadySettled {
            state: ResultState::Completed
        })
    );
    assert_eq!(result.try_outcome(), Some(Ok(1)), "终态不得被覆盖");

    let failed = AsyncResult::<u32>::from_error(ResultError::msg("boom"));
    assert_eq!(
        failed.complete(2),
        Err(CompletionError::AlreadySettled {
            state: ResultState::Failed
        })
    );
}

/// ## 竞争完成只有一方胜出
#[test]
fn racing_completers_have_exactly_one_winner() {
    let result = AsyncResult::<usize>::new();
    let barrier = Arc::new(Barrier::new(4));
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let result = result.clone();
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                barrier.wait();
                if result.complete(index).is_ok() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("完成线程不应 panic");
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(result.state(), ResultState::Completed);
}

/// ## `then` 链式组合
///
/// - **契约 (What)**：成功分支的返回结果被转发到派生结果；`exceptionally` 可以把失败恢复为值；
///   `map` 只变换成功值。
#[test]
fn then_chains_forward_handler_results() {
    let source = AsyncResult::<u32>::new();
    let doubled = source.then_value(|value| Ok(AsyncResult::from_value(value * 2)));
    let rendered = doubled.map(|value| format!("v={value}"));

    assert_eq!(rendered.state(), ResultState::Pending);
    source.complete(21).expect("首次完成必须成功");

    assert_eq!(doubled.try_outcome(), Some(Ok(42)));
    assert_eq!(rendered.try_outcome(), Some(Ok(String::from("v=42"))));
}

/// ## 处理器返回待定结果时派生结果跟随其终态
#[test]
fn then_waits_for_pending_inner_result() {
    let source = AsyncResult::from_value(1_u32);
    let inner = AsyncResult::<u32>::new();
    let handed_out = inner.clone();
    let derived = source.then_value(move |_| Ok(handed_out));

    assert_eq!(derived.state(), ResultState::Pending);
    inner.complete(5).expect("首次完成必须成功");
    assert_eq!(derived.try_outcome(), Some(Ok(5)));
}

/// ## 失败原样穿过成功分支
#[test]
fn failures_pass_through_value_handlers_unchanged() {
    let error = ResultError::msg("boom");
    let source = AsyncResult::<u32>::from_error(error.clone());
    let derived = source.map(|value| value + 1);

    match derived.try_outcome() {
        Some(Err(received)) => assert!(received.same_as(&error), "必须是同一个错误实例"),
        other => panic!("派生结果应失败，实际为 {other:?}"),
    }
}

/// ## `exceptionally` 恢复失败
#[test]
fn exceptionally_recovers_from_failure() {
    let source = AsyncResult::<u32>::from_error(ResultError::msg("boom"));
    let recovered = source.exceptionally(|error| {
        assert_eq!(error.to_string(), "boom");
        Ok(AsyncResult::from_value(0))
    });
    assert_eq!(recovered.try_outcome(), Some(Ok(0)));

    let untouched = AsyncResult::from_value(3_u32).exceptionally(|_| {
        panic!("成功值不应进入失败分支");
    });
    assert_eq!(untouched.try_outcome(), Some(Ok(3)));
}

/// ## 处理器失败与 panic
///
/// - **契约 (What)**：处理器返回 `Err` 时派生结果以该错误失败；处理器 panic 时派生结果以
///   `Panicked` 失败，panic 不会越过回调边界。
#[test]
fn handler_errors_and_panics_fail_the_derived_result() {
    let error = ResultError::msg("handler refused");
    let expected = error.clone();
    let refused = AsyncResult::from_value(1_u32).then_value::<u32, _>(move |_| Err(error));
    match refused.try_outcome() {
        Some(Err(received)) => assert!(received.same_as(&expected)),
        other => panic!("派生结果应失败，实际为 {other:?}"),
    }

    let panicked =
        AsyncResult::from_value(1_u32).then_value::<u32, _>(|_| panic!("handler exploded"));
    assert_eq!(
        panicked.try_outcome(),
        Some(Err(ResultError::Panicked("handler exploded".into())))
    );
}

/// ## 取消走失败分支
#[test]
fn cancelled_source_reaches_failure_handler() {
    let source = AsyncResult::<u32>::new();
    let seen = source.then(
        |_| Ok(AsyncResult::from_value(false)),
        |error| Ok(AsyncResult::from_value(error.is_cancelled())),
    );

    assert_eq!(source.cancel().try_outcome(), Some(Ok(true)));
    assert_eq!(seen.try_outcome(), Some(Ok(true)));
}

/// ## 不可取消的结果
#[test]
fn non_cancellable_results_ignore_cancel_requests() {
    let result = AsyncResult::<u32>::non_cancellable();
    assert_eq!(result.cancel().try_outcome(), Some(Ok(false)));
    assert_eq!(result.state(), ResultState::Pending);

    result.complete(9).expect("取消被拒绝后仍可正常完成");
    assert_eq!(result.try_outcome(), Some(Ok(9)));
}

/// ## `settle` 按 Outcome 路由终态
#[test]
fn settle_maps_outcomes_onto_states() {
    let completed = AsyncResult::<u32>::new();
    completed.settle(Ok(1)).expect("首次完成必须成功");
    assert_eq!(completed.state(), ResultState::Completed);

    let failed = AsyncResult::<u32>::new();
    failed
        .settle(Err(ResultError::msg("boom")))
        .expect("首次完成必须成功");
    assert_eq!(failed.state(), ResultState::Failed);

    let cancelled = AsyncResult::<u32>::new();
    cancelled
        .settle(Err(ResultError::Cancelled))
        .expect("首次完成必须成功");
    assert_eq!(cancelled.state(), ResultState::Cancelled);
}

/// ## 某个观察者 panic 不影响其余观察者
///
/// - **意图 (Why)**：完成方在自己的线程上依次触发回调，单个回调的 panic 不能让后续回调丢失，
///   也不能让完成方自身崩溃；
/// - **契约 (What)**：完成返回 `Ok`，排在 panic 回调之后的观察者照常收到值，并记录一条警告。
#[test]
#[traced_test]
fn panicking_observer_does_not_starve_later_observers() {
    let result = AsyncResult::<u32>::new();
    let counter = Arc::new(AtomicUsize::new(0));
    result.observe(|_| panic!("observer exploded"));
    result.observe(counting_observer(&counter));

    assert!(result.complete(7).is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(result.try_outcome(), Some(Ok(7)));
    assert!(logs_contain("result callback panicked"));
}
