// Example: sentinel-driven progressive reveal with a failed batch and a retry.
use pagewise::{
    RetryOptions, RetryState, RevealOptions, Revealer, VisibilityOptions, VisibilityTrigger,
};

fn main() {
    let data: Vec<u32> = (0..42).collect();
    let mut revealer = Revealer::new(Some(data.len()), RevealOptions::new(10)).unwrap();
    let mut trigger = VisibilityTrigger::new(VisibilityOptions::new(0.1)).unwrap();
    let mut retry = RetryState::<&str>::new(RetryOptions::new(2));
    trigger.arm(1);

    // Ratios an intersection observer might report while the user scrolls.
    let ratios = [0.0, 0.4, 0.9, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
    let mut fail_next = true;

    for ratio in ratios {
        let Some(transition) = trigger.observe_ratio(ratio) else {
            continue;
        };
        let Some(ticket) = revealer.on_visibility(transition) else {
            continue;
        };
        if retry.status() == pagewise::RetryStatus::Failed {
            retry.retry();
        } else {
            retry.reset();
            retry.start();
        }

        if fail_next {
            fail_next = false;
            revealer.fail(&ticket);
            retry.fail("timeout");
            println!("batch {:?} failed -> {:?}", ticket.range(), revealer.affordance());
            continue;
        }
        revealer.complete(&ticket, ticket.len());
        retry.succeed();
        println!(
            "batch {:?} loaded -> revealed={} affordance={:?}",
            ticket.range(),
            revealer.revealed_count(),
            revealer.affordance()
        );
    }

    println!("visible={:?}", revealer.visible_items(&data));
}
