use mainspring::execute::{execute, Config};

struct Frame(u64);

fn main() {
    let config = Config::from_args(std::env::args().skip(1)).expect("invalid arguments");

    execute(config, |app| {
        app.insert_resource(Frame(0)).map_err(|e| e.to_string())?;

        app.add_schedule("BeforeUpdate").map_err(|e| e.to_string())?;
        app.add_schedule("Update").map_err(|e| e.to_string())?;
        app.add_schedule("AfterUpdate").map_err(|e| e.to_string())?;
        app.schedule_before("BeforeUpdate", "Update")
            .map_err(|e| e.to_string())?;
        app.schedule_after("AfterUpdate", "Update")
            .map_err(|e| e.to_string())?;

        app.add_system("BeforeUpdate", "advance", |txn| {
            txn.resource_mut::<Frame>().map_err(|e| e.to_string())?.0 += 1;
            Ok(())
        })
        .map_err(|e| e.to_string())?;

        app.add_system("Update", "greet", |txn| {
            let frame = txn.resource::<Frame>().map_err(|e| e.to_string())?.0;
            println!("hello from frame {}", frame);
            Ok(())
        })
        .map_err(|e| e.to_string())?;

        app.add_system("AfterUpdate", "farewell", |_txn| {
            println!("frame complete");
            Ok(())
        })
        .map_err(|e| e.to_string())?;

        Ok(())
    })
    .expect("app failed");
}
