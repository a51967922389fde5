//! Command-line driver that compiles DIMACS CNF/DNF into a ZSDD (§6).

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

use zsdd::{Manager, VTree};
use zsdd_cli::{compile, dimacs, vtree_file};

/// zsdd: compile a DIMACS CNF or DNF file into a Zero-suppressed
/// Sentential Decision Diagram.
#[derive(StructOpt, Debug)]
#[structopt(name = "zsdd")]
struct Opt {
    /// Input CNF file (DIMACS format)
    #[structopt(short = "c", long = "cnf", parse(from_os_str))]
    cnf: Option<PathBuf>,

    /// Input DNF file (DIMACS-shaped: one term per line, 0-terminated)
    #[structopt(short = "d", long = "dnf", parse(from_os_str))]
    dnf: Option<PathBuf>,

    /// Vtree file (SDD format); default is a right-linear vtree
    #[structopt(short = "v", long = "vtree", parse(from_os_str))]
    vtree: Option<PathBuf>,

    /// Rewrite the compiled diagram into explicit form before exporting
    #[structopt(short = "e", long = "explicit")]
    explicit: bool,

    /// Write the text export to this file
    #[structopt(short = "R", long = "text-out", parse(from_os_str))]
    text_out: Option<PathBuf>,

    /// Write the DOT export to this file
    #[structopt(short = "S", long = "dot-out", parse(from_os_str))]
    dot_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    // `structopt`/`clap` intercept `-h`/`--help` (and `--version`) inside
    // `from_args()` and exit 0 on those paths. Spec §6 requires every help
    // path — explicit `-h` and the no-arguments case below — to exit 1, so
    // parse through `from_args_safe()` and print+exit ourselves instead.
    let opt = match Opt::from_args_safe() {
        Ok(opt) => opt,
        Err(e) => {
            print!("{e}");
            std::process::exit(1);
        }
    };

    if opt.cnf.is_none() && opt.dnf.is_none() {
        Opt::clap().print_help()?;
        println!();
        std::process::exit(1);
    }

    let (input_path, is_cnf) = match (&opt.cnf, &opt.dnf) {
        (Some(p), _) => (p, true),
        (None, Some(p)) => (p, false),
        (None, None) => unreachable!("checked above"),
    };

    let fnf = dimacs::parse(input_path)?;
    log::info!(
        "read {} {}, {} variables, {} {}",
        if is_cnf { "cnf" } else { "dnf" },
        input_path.display(),
        fnf.num_variables,
        fnf.clauses.len(),
        if is_cnf { "clauses" } else { "terms" },
    );

    let vtree = match &opt.vtree {
        Some(path) => {
            log::info!("loading vtree from {}", path.display());
            vtree_file::parse(path)?
        }
        None => {
            log::info!("building right-linear vtree over {} variables", fnf.num_variables);
            VTree::right_linear(fnf.num_variables)
        }
    };

    let mgr = Manager::new(vtree);

    log::info!("compiling...");
    let mut z = if is_cnf {
        compile::compile_cnf(&mgr, &fnf.clauses, fnf.num_variables)
    } else {
        compile::compile_dnf(&mgr, &fnf.clauses, fnf.num_variables)
    };

    if opt.explicit {
        z = mgr.to_explicit_form(&z);
    }

    log::info!("zsdd node count: {}", mgr.size(&z));
    log::info!("zsdd model count: {}", mgr.count(&z));

    if let Some(path) = &opt.text_out {
        log::info!("writing text export to {}", path.display());
        let file = File::create(path).with_context(|| format!("can't create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        mgr.export_text(&z, &mut out)?;
    }

    if let Some(path) = &opt.dot_out {
        log::info!("writing dot export to {}", path.display());
        let file = File::create(path).with_context(|| format!("can't create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        mgr.export_dot(&z, &mut out)?;
    }

    Ok(())
}
