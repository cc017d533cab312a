use clap::Parser;
use robin_table::HashTable;
use robin_table::RecordTable;
use robin_table::Slot;

#[derive(Parser, Debug)]
struct Args {
    /// Number of slots in the buffer.
    #[arg(short = 'c', long = "capacity", default_value_t = 997)]
    capacity: usize,

    /// Percentage of the slots to fill, 0 to 100.
    #[arg(short = 'l', long = "load", default_value_t = 90)]
    load: usize,
}

fn print_histogram<V>(table: &HashTable<'_, V>) {
    println!("=== Displacement Histogram ===");
    let histogram = table.probe_histogram();
    let widest = histogram.iter().copied().max().unwrap_or(0).max(1);
    for (displacement, &count) in histogram.iter().enumerate() {
        let bar = "#".repeat(count * 50 / widest);
        println!("{displacement:>4}: {count:>7} {bar}");
    }
}

fn main() {
    let args = Args::parse();
    let target = args.capacity * args.load.min(100) / 100;

    println!(
        "Creating table with {} slots, filling {} ({}%)",
        args.capacity, target, args.load
    );

    let mut slots: Vec<Slot<(String, u64)>> = (0..args.capacity).map(|_| Slot::empty()).collect();
    let mut records = RecordTable::new(&mut slots);

    let mut failures = 0;
    for i in 0..target as u64 {
        if let Err(err) = records.set((format!("key-{i:08}"), i)) {
            eprintln!("insert {i} failed: {err}");
            failures += 1;
        }
    }

    println!("Inserted {} records ({} failures)", records.len(), failures);
    print_histogram(records.table());
    records.table().debug_stats().print();

    println!();
    println!("Removing every other record...");
    for i in (0..target as u64).step_by(2) {
        match records.remove(&format!("key-{i:08}")) {
            Ok(Some(_)) => {}
            Ok(None) => eprintln!("key-{i:08} was missing"),
            Err(err) => eprintln!("remove {i} failed: {err}"),
        }
    }

    println!("{} records remain", records.len());
    print_histogram(records.table());
    records.table().debug_stats().print();
}
