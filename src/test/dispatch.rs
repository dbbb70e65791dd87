use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response};

use crate::test::scenario::{get, wait_until, Gate, Scenario, Step};
use crate::{Body, Call, CallFactory, Client, Dispatcher, Error, Tag};

fn client_with(scenario: &Scenario, dispatcher: &Arc<Dispatcher>) -> Client {
    scenario
        .client_builder()
        .scheduler_arc(dispatcher.clone())
        .build()
}

/// Enqueue a call reporting its outcome on `tx`.
fn enqueue(client: &Client, request: Request<Body>, tx: &mpsc::Sender<Result<u16, Error>>) -> Call {
    let tx = tx.clone();
    let call = client.new_call(request);
    call.enqueue(move |_: &Call, result: Result<Response<Body>, Error>| {
        tx.send(result.map(|r| r.status().as_u16())).unwrap();
    })
    .unwrap();
    call
}

fn collect(rx: &mpsc::Receiver<Result<u16, Error>>, n: usize) -> Vec<Result<u16, Error>> {
    (0..n)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect()
}

#[test]
fn limits_per_host_and_total() {
    let gate = Gate::new();
    let scenario = Scenario::builder()
        .fallback(Step::Hold(gate.clone()))
        .build();
    let dispatcher = Arc::new(Dispatcher::with_limits(3, 2));
    let client = client_with(&scenario, &dispatcher);
    let (tx, rx) = mpsc::channel();

    enqueue(&client, get("http://a.test/1"), &tx);
    enqueue(&client, get("http://a.test/2"), &tx);
    let waiting = enqueue(&client, get("http://a.test/3"), &tx);
    enqueue(&client, get("http://b.test/1"), &tx);

    assert_eq!(dispatcher.running_calls_count(), 3);
    assert_eq!(dispatcher.queued_calls_count(), 1);
    assert_eq!(dispatcher.queued_calls()[0].id(), waiting.id());

    gate.open();

    let outcomes = collect(&rx, 4);
    assert!(outcomes.iter().all(|o| *o == Ok(200)));

    wait_until(|| dispatcher.running_calls_count() == 0);
    assert_eq!(dispatcher.queued_calls_count(), 0);
    assert_eq!(scenario.starts(), 4);
}

#[test]
fn raising_limit_promotes() {
    let gate = Gate::new();
    let scenario = Scenario::builder()
        .fallback(Step::Hold(gate.clone()))
        .build();
    let dispatcher = Arc::new(Dispatcher::with_limits(1, 5));
    let client = client_with(&scenario, &dispatcher);
    let (tx, rx) = mpsc::channel();

    enqueue(&client, get("http://a.test/"), &tx);
    enqueue(&client, get("http://b.test/"), &tx);
    assert_eq!(dispatcher.running_calls_count(), 1);
    assert_eq!(dispatcher.queued_calls_count(), 1);

    dispatcher.set_max_requests(2);
    assert_eq!(dispatcher.max_requests(), 2);
    assert_eq!(dispatcher.running_calls_count(), 2);
    assert_eq!(dispatcher.queued_calls_count(), 0);

    gate.open();
    collect(&rx, 2);
}

#[test]
fn raising_host_limit_promotes() {
    let gate = Gate::new();
    let scenario = Scenario::builder()
        .fallback(Step::Hold(gate.clone()))
        .build();
    let dispatcher = Arc::new(Dispatcher::with_limits(10, 1));
    let client = client_with(&scenario, &dispatcher);
    let (tx, rx) = mpsc::channel();

    enqueue(&client, get("http://a.test/1"), &tx);
    enqueue(&client, get("http://A.test/2"), &tx);
    assert_eq!(dispatcher.queued_calls_count(), 1);

    dispatcher.set_max_requests_per_host(2);
    assert_eq!(dispatcher.queued_calls_count(), 0);

    gate.open();
    collect(&rx, 2);
}

#[test]
fn finishing_promotes_in_order() {
    let scenario = Scenario::builder().build();
    let dispatcher = Arc::new(Dispatcher::with_limits(1, 1));
    let client = client_with(&scenario, &dispatcher);
    let (tx, rx) = mpsc::channel();

    for i in 0..5 {
        enqueue(&client, get(&format!("http://f.test/{}", i)), &tx);
    }

    let outcomes = collect(&rx, 5);
    assert!(outcomes.iter().all(|o| *o == Ok(200)));

    let paths: Vec<_> = scenario
        .requests()
        .iter()
        .map(|r| r.uri().path().to_string())
        .collect();
    assert_eq!(paths, ["/0", "/1", "/2", "/3", "/4"]);
}

#[test]
fn cancel_all() {
    let scenario = Scenario::builder()
        .fallback(Step::BlockUntilCanceled)
        .build();
    let dispatcher = Arc::new(Dispatcher::with_limits(1, 1));
    let client = client_with(&scenario, &dispatcher);
    let (tx, rx) = mpsc::channel();

    enqueue(&client, get("http://f.test/running"), &tx);
    let queued = enqueue(&client, get("http://f.test/queued"), &tx);
    wait_until(|| scenario.reads() == 1);

    dispatcher.cancel_all();

    let outcomes = collect(&rx, 2);
    assert!(outcomes.iter().all(|o| *o == Err(Error::Canceled)));
    assert!(queued.is_canceled());

    // The queued call never reached the transport.
    assert_eq!(scenario.starts(), 1);
    wait_until(|| dispatcher.running_calls_count() == 0);
}

#[test]
fn cancel_tagged() {
    let scenario = Scenario::builder()
        .fallback(Step::BlockUntilCanceled)
        .build();
    let dispatcher = Arc::new(Dispatcher::new());
    let client = client_with(&scenario, &dispatcher);
    let (tx, rx) = mpsc::channel();

    let tagged = |uri: &str, tag: &str| {
        Request::get(uri)
            .extension(Tag::new(tag))
            .body(Body::empty())
            .unwrap()
    };

    let x = enqueue(&client, tagged("http://f.test/x", "x"), &tx);
    let y = enqueue(&client, tagged("http://f.test/y", "y"), &tx);
    wait_until(|| scenario.reads() == 2);

    dispatcher.cancel_tagged(&Tag::new("x"));

    assert_eq!(collect(&rx, 1), [Err(Error::Canceled)]);
    assert!(x.is_canceled());
    assert!(!y.is_canceled());
    assert_eq!(y.tag(), Some(&Tag::new("y")));
    wait_until(|| dispatcher.running_calls_count() == 1);

    y.cancel();
    collect(&rx, 1);
}

#[test]
fn limits_at_least_one() {
    let dispatcher = Dispatcher::with_limits(0, 0);
    assert_eq!(dispatcher.max_requests(), 1);
    assert_eq!(dispatcher.max_requests_per_host(), 1);

    let dispatcher = Dispatcher::default();
    assert_eq!(dispatcher.max_requests(), 64);
    assert_eq!(dispatcher.max_requests_per_host(), 5);
}
