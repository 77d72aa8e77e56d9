//! End-to-end scenarios: registration, resolution, binding and execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use formwright::app::{AddOptions, FormApp};
use formwright::execution::{
    ExecutionCoordinator, ExecutionEvent, ExecutionOutput, ExecutionState, ExecutionTicket,
};
use formwright::host::{HeadlessHost, HostQueue};
use formwright::registry::{WidgetRegistry, builtin};
use formwright::signature::Callable;
use formwright::{Arguments, Error, ProgressUpdate, Table, Value};
use formwright_core::UiQueue;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("formwright=debug,formwright_core=info")
        .with_test_writer()
        .try_init();
}

fn app() -> FormApp {
    FormApp::with_registry(Arc::new(WidgetRegistry::with_builtins()))
}

fn options(text: &str) -> Table {
    match Value::from(toml::from_str::<toml::Value>(text).unwrap()) {
        Value::Table(table) => table,
        other => panic!("expected a table, got {other:?}"),
    }
}

fn event_names(host: &HeadlessHost) -> Vec<&'static str> {
    host.events.iter().map(ExecutionEvent::name).collect()
}

fn drive(coordinator: &ExecutionCoordinator, host: &mut HeadlessHost) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !coordinator.is_idle() {
        assert!(Instant::now() < deadline, "run did not finish");
        coordinator
            .queue()
            .wait_and_process(host, Duration::from_millis(5));
    }
}

#[test]
fn signature_only_page() {
    init_tracing();
    let mut app = app();
    let add = Callable::parse("def add(a: int, b: int) -> int")
        .unwrap()
        .body(|_, args| Ok(Value::Int(args.get_i64("a")? + args.get_i64("b")?)))
        .build();
    let handle = app.add(add, AddOptions::new()).unwrap();
    let plan = app.page(handle).unwrap().plan();

    assert_eq!(plan.len(), 2);
    for (widget, name) in plan.widgets.iter().zip(["a", "b"]) {
        assert_eq!(widget.widget_kind, builtin::INT_SPIN_BOX);
        assert_eq!(widget.label, name);
        assert_eq!(widget.initial_value, Value::Int(0));
    }
}

#[test]
fn embedded_config_block() {
    let mut app = app();
    let f = Callable::parse("def f(q: int)")
        .unwrap()
        .docstring(
            "Compress a file.

            @params
            [q]
            default_value = 80
            min_value = 10
            max_value = 100
            @end
            ",
        )
        .body(|_, _| Ok(Value::None))
        .build();
    let handle = app.add(f, AddOptions::new()).unwrap();
    let page = app.page(handle).unwrap();
    let q = page.plan().get("q").unwrap();

    assert_eq!(q.widget_kind, builtin::INT_SPIN_BOX);
    assert_eq!(q.options["default_value"], Value::Int(80));
    assert_eq!(q.options["min_value"], Value::Int(10));
    assert_eq!(q.options["max_value"], Value::Int(100));
    assert_eq!(q.initial_value, Value::Int(80));
    assert_eq!(page.info().description, "Compress a file.");
}

#[test]
fn caller_overlay_wins() {
    let mut app = app();
    let f = Callable::parse("def f(q: int = 5)")
        .unwrap()
        .docstring("@params\n[q]\ndefault_value = 80\n@end")
        .body(|_, _| Ok(Value::None))
        .build();
    let handle = app
        .add(f, AddOptions::new().widget_config("q", options("default_value = 50")))
        .unwrap();
    let q = app.page(handle).unwrap().plan().get("q").unwrap();
    assert_eq!(q.options["default_value"], Value::Int(50));
    assert_eq!(q.initial_value, Value::Int(50));
}

#[test]
fn cancellation_and_busy_coordinator() {
    init_tracing();
    let queue: Arc<HostQueue> = Arc::new(UiQueue::new());
    let coordinator = ExecutionCoordinator::new(queue).unwrap();

    let looping = Arc::new(
        Callable::builder("looping")
            .body(|ctx, _| {
                let mut step = 0;
                while !ctx.is_cancel_requested() {
                    step += 1;
                    ctx.show_progress(ProgressUpdate::new(step, -1))?;
                    std::thread::sleep(Duration::from_millis(10));
                }
                Ok(Value::Int(step))
            })
            .build(),
    );
    coordinator
        .submit(ExecutionTicket::new(looping.clone(), Arguments::new()).cancelable(true))
        .unwrap();

    let rejected_events = Arc::new(AtomicUsize::new(0));
    let mut host = HeadlessHost::new();
    let started = Instant::now();
    let mut cancel_sent = false;
    while !coordinator.is_idle() {
        coordinator
            .queue()
            .wait_and_process(&mut host, Duration::from_millis(5));
        if !cancel_sent && started.elapsed() >= Duration::from_millis(50) {
            let counter = rejected_events.clone();
            let second = ExecutionTicket::new(looping.clone(), Arguments::new())
                .on_event(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            let err = coordinator.submit(second).unwrap_err();
            assert!(matches!(err, Error::CoordinatorBusy { ref running } if running == "looping"));
            assert!(!coordinator.can_close());

            assert!(coordinator.request_cancel());
            cancel_sent = true;
        }
        assert!(started.elapsed() < Duration::from_secs(10), "run did not finish");
    }

    let names = event_names(&host);
    assert_eq!(names.first(), Some(&"started"));
    assert!(names.iter().filter(|n| **n == "progress").count() >= 1);
    assert_eq!(&names[names.len() - 2..], &["canceled", "finished"]);
    assert!(!names.contains(&"result"));
    assert!(!names.contains(&"error"));
    assert_eq!(names.iter().filter(|n| **n == "started").count(), 1);
    assert_eq!(rejected_events.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.state(), ExecutionState::Idle);
}

#[test]
fn side_channel_marshalling() {
    let queue: Arc<HostQueue> = Arc::new(UiQueue::new());
    let coordinator = ExecutionCoordinator::new(queue).unwrap();
    let ask = Arc::new(
        Callable::builder("ask")
            .body(|_, _| {
                formwright::uprint("before")?;
                let answer = formwright::get_text("name?")?.unwrap_or_default();
                formwright::uprint(&answer)?;
                formwright::uprint("after")?;
                Ok(Value::from(answer))
            })
            .build(),
    );
    let ticket = ExecutionTicket::new(ask, Arguments::new()).output(ExecutionOutput::silent());
    coordinator.submit(ticket).unwrap();

    let mut host = HeadlessHost::new().answer("Ada Lovelace");
    drive(&coordinator, &mut host);

    assert_eq!(host.output, "before\nAda Lovelace\nafter\n");
    assert!(
        host.events
            .contains(&ExecutionEvent::Result(Value::from("Ada Lovelace")))
    );
}

#[test]
fn ui_failure_reaches_the_function() {
    let queue: Arc<HostQueue> = Arc::new(UiQueue::new());
    let coordinator = ExecutionCoordinator::new(queue).unwrap();
    let f = Arc::new(
        Callable::builder("f")
            .body(|ctx, _| {
                ctx.get_int("how many?", 1)?;
                Ok(Value::None)
            })
            .build(),
    );
    coordinator
        .submit(ExecutionTicket::new(f, Arguments::new()).output(ExecutionOutput::silent()))
        .unwrap();

    let mut host = HeadlessHost::new();
    drive(&coordinator, &mut host);
    let error = host.events.iter().find_map(|event| match event {
        ExecutionEvent::Error(error) => Some(error.clone()),
        _ => None,
    });
    let error = error.unwrap();
    assert_eq!(error.kind, "SideChannelError");
    assert!(error.message.contains("get_int"));
}

#[test]
fn page_round_trip_through_widgets() {
    let mut app = app();
    let f = Callable::parse("def scale(path: file, factor: float = 1.5, keep: bool = True)")
        .unwrap()
        .body(|ctx, args| {
            ctx.uprint(format!(
                "{} x{} keep={}",
                args.get_str("path")?,
                args.get_f64("factor")?,
                args.get_bool("keep")?
            ))?;
            Ok(Value::None)
        })
        .build();
    let handle = app.add(f, AddOptions::new().cancelable(true)).unwrap();
    let page = app.page(handle).unwrap();
    let mut bound = page.bind(app.registry(), None).unwrap();
    bound
        .widget_mut("path")
        .unwrap()
        .set_value(Value::from("photo.png"))
        .unwrap();
    bound
        .widget_mut("factor")
        .unwrap()
        .set_value(Value::Int(2))
        .unwrap();

    let ticket = page.ticket_from(&mut bound).unwrap();
    assert!(ticket.is_cancelable());

    let queue: Arc<HostQueue> = Arc::new(UiQueue::new());
    let coordinator = ExecutionCoordinator::new(queue).unwrap();
    coordinator
        .submit(ticket.output(ExecutionOutput::silent()))
        .unwrap();
    let mut host = HeadlessHost::new();
    drive(&coordinator, &mut host);
    assert_eq!(host.output, "photo.png x2 keep=true\n");
}
