// Example: deriving the effective policy from device and network signals.
use pagewise::{NetworkClass, Policy, PolicyOverrides, PolicySignals, derive_policy};

fn main() {
    let base = Policy::default()
        .merge(&PolicyOverrides {
            batch_size: Some(30),
            ..PolicyOverrides::default()
        })
        .unwrap();

    let profiles = [
        ("desktop", PolicySignals::default().with_network(NetworkClass::FourG, 50.0)),
        ("phone on 3g", PolicySignals {
            device_memory_gib: 3.0,
            cpu_cores: 4,
            network_class: NetworkClass::ThreeG,
            downlink_mbps: 1.5,
        }),
        ("budget phone on 2g", PolicySignals {
            device_memory_gib: 1.0,
            cpu_cores: 2,
            network_class: NetworkClass::parse("2g"),
            downlink_mbps: 0.25,
        }),
    ];

    for (name, signals) in profiles {
        println!("{name:>20}: {:?}", derive_policy(&signals, &base));
    }
}
