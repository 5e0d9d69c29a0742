use clap::{Parser, Subcommand};
use icvm::{cli, Book, BookError, Config, DefId, Vm};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand)]
enum Demo {
  /// Erases a duplicated pair: {a a} ~ (* *)
  Erase,

  /// Adds two numbers
  Add {
    a: f64,
    b: f64,
  },

  /// Computes 2^N by unfolding a doubly recursive definition
  Pow2 {
    depth: u32,
  },

  /// Duplicates a tree of depth N
  Copy {
    depth: u32,
  },
}

impl Demo {
  fn book(&self) -> Result<(Book, DefId), BookError> {
    match *self {
      Demo::Erase => Book::demo_erase(),
      Demo::Add { a, b } => Book::demo_add(a, b),
      Demo::Pow2 { depth } => Book::demo_pow2(depth),
      Demo::Copy { depth } => Book::demo_copy(depth),
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Runs a built-in demo net
  #[command(aliases = &["r"])]
  Run {
    #[command(subcommand)]
    demo: Demo,
  },

  /// Prints the definitions of a built-in demo net
  #[command(aliases = &["s"])]
  Show {
    #[command(subcommand)]
    demo: Demo,
  },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
  /// Set the memory size (in 64-bit nodes).
  #[arg(short = 's', long, default_value = "auto", value_parser = cli::parse_size)]
  size: usize,

  /// Set the number of threads to use.
  #[arg(short = 't', long, default_value = "auto", value_parser = cli::parse_tids)]
  tids: usize,

  /// Shows the number of interactions performed.
  #[arg(short = 'c', long)]
  cost: bool,

  /// Keeps every seed redex on the first thread.
  #[arg(long)]
  no_spread: bool,

  #[command(subcommand)]
  command: Commands,
}

fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
  let Cli { size, tids, cost, no_spread, command } = Cli::parse();

  match command {
    Commands::Run { demo } => {
      let (book, main) = demo.book()?;
      let config = Config::scaled(size).with_tids(tids).with_spread(!no_spread);
      let mut vm = Vm::new(config)?;

      let start = instant::Instant::now();
      let root = vm.boot(&book, main)?;
      vm.run(&book)?;
      let time = start.elapsed().as_secs_f64();

      println!("{}", vm.readback(root));
      if cost {
        let itrs = vm.interactions();
        let rw = vm.rewrites();
        eprintln!();
        eprintln!("ITRS: {}", itrs);
        eprintln!("ANNI: {} | COMM: {} | ERAS: {} | CALL: {} | OPER: {}", rw.anni, rw.comm, rw.eras, rw.call, rw.oper);
        eprintln!("TIME: {:.3}s", time);
        eprintln!("MIPS: {:.2}", itrs as f64 / time / 1_000_000.0);
      }
      Ok(())
    }
    Commands::Show { demo } => {
      let (book, _) = demo.book()?;
      print!("{}", book.show());
      Ok(())
    }
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();
  if let Err(err) = run_cli() {
    eprintln!("{}", err);
    std::process::exit(1);
  }
}
