//! Tests for the operation queue

use simfit_rs::worker::{Operation, OperationQueue, Request};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn request(operation: Operation) -> Request {
    Request::from_operation(operation).unwrap()
}

#[test]
fn test_stop_is_dequeued_before_earlier_renders() {
    let queue = OperationQueue::new();
    for operation in [
        Operation::Render,
        Operation::Render,
        Operation::Stop,
        Operation::Render,
    ] {
        queue.enqueue(request(operation)).unwrap();
    }

    let order: Vec<_> = std::iter::from_fn(|| queue.try_dequeue())
        .map(|r| r.operation())
        .collect();
    assert_eq!(
        order,
        vec![
            Operation::Stop,
            Operation::Render,
            Operation::Render,
            Operation::Render
        ]
    );
}

#[test]
fn test_arrival_order_for_everything_else() {
    let queue = OperationQueue::new();
    let ops = [
        Operation::Present,
        Operation::StartAnimation,
        Operation::Render,
        Operation::StopAnimation,
        Operation::AnimationFrame,
    ];
    for op in ops {
        queue.enqueue(request(op)).unwrap();
    }

    let order: Vec<_> = std::iter::from_fn(|| queue.try_dequeue())
        .map(|r| r.operation())
        .collect();
    assert_eq!(order, ops.to_vec());
}

#[test]
fn test_consumer_blocks_until_work_arrives() {
    let queue = Arc::new(OperationQueue::<Request>::new());
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.dequeue().map(|r| r.operation()))
    };

    thread::sleep(Duration::from_millis(20));
    queue.enqueue(request(Operation::Present)).unwrap();
    assert_eq!(consumer.join().unwrap(), Some(Operation::Present));
}

#[test]
fn test_closed_queue_rejects_and_releases() {
    let queue = Arc::new(OperationQueue::new());
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.dequeue().is_none())
    };

    thread::sleep(Duration::from_millis(20));
    assert!(queue.close().is_empty());
    assert!(consumer.join().unwrap());

    let rejected = queue.enqueue(request(Operation::Render)).unwrap_err();
    assert_eq!(rejected.operation(), Operation::Render);
    assert!(queue.is_closed());
}
