//! # Subscriber Example
//!
//! Wires a few components through an [`EventRegistry`]:
//! - a weak bound-method subscriber that goes away when its owner is dropped
//! - a filtered keep-alive counter
//! - a marshaled handler drained by a home thread
//! - a background handler on the tokio blocking pool
//!
//! ## Run
//! ```bash
//! RUST_LOG=weakbus=trace cargo run --example subscriber
//! ```

use std::{
    sync::Arc,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use weakbus::{
    Action, DataEventArgs, Delegate, Dispatch, Event, EventRegistry, HomeContext, Predicate,
    SubscribeOptions,
};

struct OrderPlaced;
impl Event for OrderPlaced {
    type Payload = DataEventArgs<u64>;
}

struct Shutdown;
impl Event for Shutdown {
    type Payload = ();
}

struct Audit {
    seen: AtomicU64,
}

impl Audit {
    fn on_order(&self, order: &DataEventArgs<u64>) {
        self.seen.fetch_add(1, Ordering::Relaxed);
        println!("audit     ─► order #{}", order.value());
    }
}

fn large_order(order: &DataEventArgs<u64>) -> bool {
    *order.value() >= 100
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (ctx, home) = HomeContext::new("main");
    let registry = EventRegistry::builder()
        .with_home_context(Arc::new(ctx))
        .with_runtime(tokio::runtime::Handle::current())
        .build();

    let stop = CancellationToken::new();
    let home_task = tokio::spawn(home.run(stop.clone()));

    let orders = registry.get::<OrderPlaced>();

    // Weak: lives exactly as long as `audit`.
    let audit = Arc::new(Audit { seen: AtomicU64::new(0) });
    let on_order: Action<DataEventArgs<u64>> = Delegate::method(&audit, Audit::on_order);
    orders.subscribe(&on_order)?;
    drop(on_order);

    // Keep-alive + filter: survives without any owner.
    let large = Arc::new(AtomicU64::new(0));
    let l = Arc::clone(&large);
    let count_large: Action<DataEventArgs<u64>> = Delegate::new(move |_: &DataEventArgs<u64>| {
        l.fetch_add(1, Ordering::Relaxed);
    });
    let filter: Predicate<DataEventArgs<u64>> = Delegate::from_fn(large_order);
    orders.subscribe_with(
        &count_large,
        SubscribeOptions::default()
            .with_filter(&filter)
            .with_keep_alive(true),
    )?;

    // Marshaled: runs on the home task.
    let on_home: Action<DataEventArgs<u64>> = Delegate::new(|order: &DataEventArgs<u64>| {
        println!("home      ─► order #{}", order.value());
    });
    let home_token = orders.subscribe_on(&on_home, Dispatch::Marshaled)?;

    // Background: blocking pool of the runtime above.
    let on_background: Action<()> = Delegate::new(|_: &()| {
        println!("background─► shutdown requested");
    });
    let _guard = registry
        .get::<Shutdown>()
        .subscribe_on(&on_background, Dispatch::Background)?
        .drop_guard();

    for id in [7, 120, 42, 300] {
        orders.publish(DataEventArgs::new(id));
    }

    drop(audit);
    home_token.dispose();
    orders.publish(DataEventArgs::new(999));

    registry.get::<Shutdown>().signal();
    tokio::time::sleep(Duration::from_millis(100)).await;

    stop.cancel();
    home_task.await?;

    println!();
    println!("Summary:");
    println!(" ├─► Channels:      {}", registry.len());
    println!(" ├─► Subscriptions: {}", orders.len());
    println!(" └─► Large orders:  {}", large.load(Ordering::Relaxed));
    Ok(())
}
