//! Request/response correlation under arbitrary response orderings.

use std::sync::Arc;

use pixbridge_rpc::{AnyResponse, Bridge, Error, LogNotifier, Message, PeerSocket};
use proptest::prelude::*;
use serde_json::json;

fn run<F: std::future::Future>(fut: F) -> F::Output {
	tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(fut)
}

proptest! {
	#[test]
	fn every_caller_gets_its_own_response(order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()) {
		let outcomes = run(async {
			let (socket, mut rx) = PeerSocket::channel();
			let bridge = Arc::new(Bridge::new("prop", socket, Arc::new(LogNotifier)));

			let mut tasks = Vec::new();
			let mut ids = Vec::new();
			for n in 0..8u64 {
				let bridge = bridge.clone();
				tasks.push(tokio::spawn(async move { bridge.request_raw("echo", json!(n)).await }));
				let Some(Message::Request(req)) = rx.recv().await else {
					panic!("expected request");
				};
				ids.push((req.id, req.params));
			}

			for &i in &order {
				let (id, params) = ids[i].clone();
				bridge.accept(Message::Response(AnyResponse { id, result: Ok(params) }));
			}

			let mut outcomes = Vec::new();
			for task in tasks {
				outcomes.push(task.await.unwrap());
			}
			(outcomes, bridge.pending_len())
		});

		let (outcomes, pending) = outcomes;
		prop_assert_eq!(pending, 0);
		for (n, outcome) in outcomes.into_iter().enumerate() {
			prop_assert_eq!(outcome.unwrap(), json!(n as u64));
		}
	}

	#[test]
	fn cancelled_requests_never_resolve_late(cut in 0..6usize) {
		let results = run(async {
			let (socket, mut rx) = PeerSocket::channel();
			let bridge = Arc::new(Bridge::new("prop", socket, Arc::new(LogNotifier)));

			let mut tasks = Vec::new();
			let mut ids = Vec::new();
			for _ in 0..6 {
				let bridge = bridge.clone();
				tasks.push(tokio::spawn(async move { bridge.request_raw("slow", json!(null)).await }));
				let Some(Message::Request(req)) = rx.recv().await else {
					panic!("expected request");
				};
				ids.push(req.id);
			}
			for id in &ids[..cut] {
				bridge.accept(Message::Response(AnyResponse { id: *id, result: Ok(json!("done")) }));
			}
			bridge.cancel_all();
			for id in &ids[cut..] {
				bridge.accept(Message::Response(AnyResponse { id: *id, result: Ok(json!("late")) }));
			}

			let mut results = Vec::new();
			for task in tasks {
				results.push(task.await.unwrap());
			}
			results
		});

		for (i, result) in results.into_iter().enumerate() {
			if i < cut {
				prop_assert_eq!(result.unwrap(), json!("done"));
			} else {
				prop_assert!(matches!(result, Err(Error::Cancelled)));
			}
		}
	}
}
