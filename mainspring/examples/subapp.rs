use std::time::Duration;

use mainspring::{App, SubAppChildResource, SubAppConfig, SubAppParentResource};

/// Hosts a squaring service in a subapp and queries it from the parent.
fn main() {
    let mut parent = App::new();

    parent
        .spawn_subapp::<u64, u64, _, _>(
            || {
                let mut child = App::new();
                child.add_schedule("respond").unwrap();
                child
                    .add_system("respond", "square", |txn| {
                        let input = *txn.resource::<u64>().map_err(|e| e.to_string())?;
                        txn.resource::<SubAppChildResource<u64>>()
                            .map_err(|e| e.to_string())?
                            .send(input * input)
                            .map_err(|e| e.to_string())
                    })
                    .unwrap();
                child
            },
            |child, input| {
                if child.insert_resource(input).is_err() {
                    *child.resource_mut::<u64>().expect("input resource missing") = input;
                }
                Ok(())
            },
            SubAppConfig::default(),
        )
        .expect("failed to spawn subapp");

    {
        let pipe = parent
            .resource::<SubAppParentResource<u64, u64>>()
            .expect("subapp pipe missing");
        for input in 1..=5 {
            pipe.send(input).expect("failed to send");
            let squared = pipe.recv().expect("failed to receive");
            println!("{} squared is {}", input, squared);
        }
    }

    parent
        .stop_subapps(Duration::from_secs(1))
        .expect("failed to stop subapps");
}
