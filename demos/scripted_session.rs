//! Demonstration of the behavior engine on a scripted stimulus timeline.
//!
//! This example shows how to:
//! 1. Wire an engine to an in-process bus
//! 2. Feed it touch, radar and sleep messages
//! 3. Watch the commands it publishes
//!
//! Timings are shortened (300 ms debounce, 2 s idle) so the whole
//! session plays out in a few seconds.
//!
//! Run with: cargo run --example scripted_session

use std::sync::Arc;
use std::time::{Duration, Instant};

use friend_head::{
    bus::{LocalBus, Message},
    core::Engine,
    telemetry::create_shared_telemetry,
    Config, Timings,
};

fn main() {
    println!("Friend Head - Scripted Session");
    println!("==============================");
    println!();

    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");

    let mut config = Config::default();
    config.timings = Timings {
        touch_release: Duration::from_millis(300),
        radar_clear: Duration::from_millis(300),
        radar_cooldown: Duration::from_millis(300),
        idle_timeout: Duration::from_secs(2),
    };

    let bus = Arc::new(LocalBus::new());
    let tap = bus.tap();
    let telemetry = create_shared_telemetry();
    let engine = Engine::new(
        bus.clone(),
        &config,
        telemetry.clone(),
        runtime.handle().clone(),
    );
    engine.start().expect("Failed to subscribe");

    // (delay before sending, topic, payload)
    let script = [
        (0, "/touch", "L_HEAD=1,R_HEAD=0"),
        (100, "/radar", "1"),
        (200, "/touch", "L_HEAD=0,R_HEAD=0"),
        (100, "/touch", "touch:R_HEAD=1"),
        (100, "/touch", "L_HEAD=0,R_HEAD=0"),
        (1000, "/radar", "radar:0"),
        (3000, "/touch", "L_HEAD=1"),
    ];

    let started = Instant::now();
    let printer = std::thread::spawn(move || {
        for message in tap.iter() {
            let at = started.elapsed().as_millis();
            println!("[{at:>5} ms] -> {} {}", message.topic, message.payload);
        }
    });

    for (delay_ms, topic, payload) in script {
        std::thread::sleep(Duration::from_millis(delay_ms));
        println!("[{:>5} ms] <- {topic} {payload}", started.elapsed().as_millis());
        bus.inject(Message::new(topic, payload));
        while let Ok(message) = bus.receiver().try_recv() {
            engine.dispatch(&message);
        }
    }

    // Let the last release and cooldown play out
    std::thread::sleep(Duration::from_millis(200));
    bus.inject(Message::new("/touch", "L_HEAD=0,R_HEAD=0"));
    while let Ok(message) = bus.receiver().try_recv() {
        engine.dispatch(&message);
    }
    std::thread::sleep(Duration::from_millis(800));

    engine.shutdown();
    bus.disconnect();
    let _ = printer.join();

    println!();
    println!("{}", telemetry.summary());
    println!();
    println!("Final state: {:?}", engine.snapshot());
}
