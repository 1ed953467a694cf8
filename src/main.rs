use clap::{Parser, Subcommand};
use log::{error, info};
use small_kv::{
    btree::select_all,
    transaction::{start_transaction, Transaction},
    utils, Database, SmallResult,
};

#[derive(Parser)]
#[command(name = "small-kv", about = "A small multi-version key-value storage engine")]
struct Args {
    /// Path of the database file
    #[arg(long, default_value = "small.db")]
    file: String,

    /// Path of the write-ahead log
    #[arg(long, default_value = "wal.txt")]
    wal: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert a key/value pair (an existing key gets a new row version)
    Insert { key: u32, value: u32 },

    /// Delete a key
    Delete { key: u32 },

    /// Print every row visible to a fresh transaction
    Select,

    /// Run the six-thread demo workload and print the surviving rows
    Demo,
}

fn main() {
    utils::init_log();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        e.show_backtrace();
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> SmallResult {
    let db = Database::open(&args.file, &args.wal)?;

    match &args.command {
        Command::Insert { key, value } => {
            let tx_id = start_transaction(&db, &Transaction::insert(*key, *value))?;
            info!("insert({}, {}) ran as tx_{}", key, value, tx_id);
        }
        Command::Delete { key } => {
            let tx_id = start_transaction(&db, &Transaction::delete(*key))?;
            info!("delete({}) ran as tx_{}", key, tx_id);
        }
        Command::Select => {
            print_rows(&db)?;
        }
        Command::Demo => {
            demo(&db)?;
            print_rows(&db)?;
        }
    }

    db.close()
}

/// Five inserts and one delete racing on their own threads, the workload
/// the engine's locks exist for.
fn demo(db: &Database) -> SmallResult {
    let workload = vec![
        Transaction::insert(3, 3),
        Transaction::insert(6, 6),
        Transaction::insert(9, 9),
        Transaction::delete(3),
        Transaction::insert(12, 12),
        Transaction::insert(15, 15),
    ];

    crossbeam::scope(|s| {
        for tx in workload {
            s.spawn(move |_| match start_transaction(db, &tx) {
                Ok(tx_id) => info!("tx_{}: {}", tx_id, tx),
                Err(e) => error!("{} failed: {}", tx, e),
            });
        }
    })
    .unwrap();

    Ok(())
}

fn print_rows(db: &Database) -> SmallResult {
    let tx_id = db.wal().next_xid()?;
    for row in select_all(db, tx_id)? {
        println!(
            "{} -> {} [xmin: {}, xmax: {}]",
            row.key, row.data, row.xmin, row.xmax
        );
    }
    Ok(())
}
