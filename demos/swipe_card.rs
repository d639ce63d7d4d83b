//! Drive the swipe card state machine with a scripted gesture.
//!
//! Run with: cargo run --example swipe_card

use showcase_core::{SwipeCardController, SwipeOutcome, DEFAULT_SWIPE_THRESHOLD};
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("showcase_core=trace".parse().unwrap()),
        )
        .init();

    let card = SwipeCardController::new(DEFAULT_SWIPE_THRESHOLD, || {
        println!("  >> swipe action fired!");
    });

    // A timid drag that springs back.
    println!("Short drag:");
    card.drag_start();
    for translation in [-20.0, -40.0, -60.0] {
        card.drag_move(translation);
        let v = card.visual();
        println!(
            "  offset {:>7.1}  opacity {:.2}  color {}",
            v.offset, v.opacity, v.background
        );
    }
    assert_eq!(card.drag_end(-60.0), SwipeOutcome::Reset);
    println!("  released -> springs back\n");

    // A committed swipe.
    println!("Full swipe:");
    card.drag_start();
    for translation in [-50.0, -100.0, -150.0] {
        card.drag_move(translation);
        let v = card.visual();
        println!(
            "  offset {:>7.1}  opacity {:.2}  color {}",
            v.offset, v.opacity, v.background
        );
    }
    assert_eq!(card.drag_end(-150.0), SwipeOutcome::Committed);

    let v = card.visual();
    println!("  released -> animating to offset {:.0}", v.offset);

    // The card resets on its own half a second later.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let v = card.visual();
    println!(
        "  after auto-reset: offset {:.1}, opacity {:.2}",
        v.offset, v.opacity
    );
}
