//! Worker-thread pool driving the per-translation-unit pipeline (component E).
//!
//! The driver resolves every compile command against the cache first; only
//! the misses are dispatched to a pool of OS threads. Each worker owns an
//! independent [`z3::Context`]: it rebuilds the same prior-type and
//! protocol seed facts the driver already loaded (mirroring the
//! address-space copy a forked worker process would inherit, without
//! actually forking), parses its assigned translation units with `clang`,
//! walks them with [`Walker`], and sends back one [`SerializedTu`] per TU.
//! The driver never shares a `z3` AST node across threads — only plain
//! data crosses the channel.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use clang::{Clang, Index};
use z3::{Config, Context, Solver};

use crate::algebra::TypeSystem;
use crate::ast;
use crate::cache::{SerializedTu, TuCache};
use crate::config::AnalysisConfig;
use crate::context::AnalysisContext;
use crate::error::PipelineError;
use crate::prior_types::VariableDescription;
use crate::protocol::ProtocolDefinitionSource;
use crate::walker::Walker;

/// One entry of a `compile_commands.json` database: enough to invoke the
/// C/C++ parser exactly the way the original build did.
#[derive(Clone, Debug)]
pub struct CompileUnit {
    pub directory: PathBuf,
    pub filename: PathBuf,
    pub arguments: Vec<String>,
}

impl CompileUnit {
    pub fn full_path(&self) -> PathBuf {
        if self.filename.is_absolute() {
            self.filename.clone()
        } else {
            self.directory.join(&self.filename)
        }
    }
}

/// Reads every entry of the compilation database directory (containing a
/// `compile_commands.json`) at `db_dir`.
pub fn load_compilation_database(db_dir: &std::path::Path) -> Result<Vec<CompileUnit>, PipelineError> {
    let db = clang::CompilationDatabase::from_directory(db_dir).map_err(|_| PipelineError::CompilationDatabase {
        path: db_dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "compile_commands.json missing or invalid"),
    })?;
    Ok(db
        .get_all_compile_commands()
        .get_commands()
        .into_iter()
        .map(|cmd| CompileUnit {
            directory: cmd.get_directory(),
            filename: cmd.get_filename(),
            arguments: cmd.get_arguments(),
        })
        .collect())
}

/// Everything a worker needs besides its own `z3::Context`: shared,
/// cheaply cloned, read-only inputs.
struct WorkerInputs {
    config: AnalysisConfig,
    priors: Arc<Vec<VariableDescription>>,
    protocol_src: Arc<ProtocolDefinitionSource>,
    cache: Arc<TuCache>,
}

/// Runs every compile command in `db_dir` not already served by `cache`,
/// returning one [`SerializedTu`] per translation unit (cached or freshly
/// analyzed). Does not touch the global solver — merging is [`crate::solve`]'s
/// job.
pub fn run(
    db_dir: &std::path::Path,
    config: &AnalysisConfig,
    priors: Arc<Vec<VariableDescription>>,
    protocol_src: Arc<ProtocolDefinitionSource>,
    cache: Arc<TuCache>,
) -> Result<Vec<SerializedTu>, PipelineError> {
    let units = load_compilation_database(db_dir)?;

    let mut results = Vec::with_capacity(units.len());
    let mut to_dispatch = Vec::new();

    for unit in units {
        let basename = unit.filename.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if config.ignore_files.contains(&basename) {
            tracing::info!(file = %basename, "skipping ignored file");
            continue;
        }
        match cache.get_stored(&unit.full_path()) {
            Some(stu) => results.push(stu),
            None => to_dispatch.push(unit),
        }
    }

    if to_dispatch.is_empty() {
        return Ok(results);
    }

    let num_workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(to_dispatch.len());

    let (work_tx, work_rx) = mpsc::sync_channel::<Option<CompileUnit>>(to_dispatch.len() + num_workers);
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (result_tx, result_rx) = mpsc::sync_channel::<Option<SerializedTu>>(num_workers.max(1));

    let inputs = Arc::new(WorkerInputs { config: config.clone(), priors, protocol_src, cache: Arc::clone(&cache) });

    let in_flight: Vec<Arc<Mutex<Option<PathBuf>>>> = (0..num_workers).map(|_| Arc::new(Mutex::new(None))).collect();

    let handles: Vec<_> = (0..num_workers)
        .map(|i| {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let inputs = Arc::clone(&inputs);
            let in_flight = Arc::clone(&in_flight[i]);
            std::thread::Builder::new()
                .name(format!("tu-worker-{i}"))
                .spawn(move || worker_loop(&work_rx, &result_tx, &inputs, &in_flight))
                .expect("spawn worker thread")
        })
        .collect();
    drop(result_tx);

    for unit in to_dispatch {
        let _ = work_tx.send(Some(unit));
    }
    for _ in 0..num_workers {
        let _ = work_tx.send(None);
    }
    drop(work_tx);

    let mut live_workers = num_workers;
    while live_workers > 0 {
        match result_rx.recv() {
            Ok(Some(stu)) => results.push(stu),
            Ok(None) => live_workers -= 1,
            Err(_) => break,
        }
    }

    for (handle, in_flight) in handles.into_iter().zip(&in_flight) {
        if handle.join().is_err() {
            let file = in_flight.lock().unwrap().clone().unwrap_or_default();
            let err = PipelineError::WorkerPanicked { file };
            tracing::warn!(%err, "worker thread panicked; its translation unit was dropped from this run");
        }
    }

    Ok(results)
}

/// One worker's lifetime: build a private context, seed it, then drain the
/// work channel until the `None` sentinel.
fn worker_loop(
    work_rx: &Mutex<mpsc::Receiver<Option<CompileUnit>>>,
    result_tx: &mpsc::SyncSender<Option<SerializedTu>>,
    inputs: &WorkerInputs,
    in_flight: &Mutex<Option<PathBuf>>,
) {
    let clang = match Clang::new() {
        Ok(c) => c,
        Err(err) => {
            tracing::error!(%err, "failed to initialize libclang in worker");
            let _ = result_tx.send(None);
            return;
        }
    };
    let index = Index::new(&clang, false, false);

    let ctx3 = Context::new(&Config::new());
    let sys = TypeSystem::new(&ctx3, &inputs.config);
    let mut analysis = AnalysisContext::new();
    seed_worker_context(&sys, &mut analysis, inputs);

    loop {
        let unit = {
            let rx = work_rx.lock().unwrap();
            rx.recv()
        };
        let unit = match unit {
            Ok(Some(unit)) => unit,
            Ok(None) | Err(_) => break,
        };

        *in_flight.lock().unwrap() = Some(unit.full_path());
        let stu = parse_and_walk(&index, &sys, &mut analysis, &unit);
        *in_flight.lock().unwrap() = None;

        if let Some(stu) = stu {
            if let Err(err) = inputs.cache.write_to_disk(&stu) {
                tracing::warn!(?err, "could not write cache entry");
            }
            inputs.cache.save_to_memory(stu.clone());
            let _ = result_tx.send(Some(stu));
        }
    }

    let _ = result_tx.send(None);
}

/// Reloads the prior-types descriptions and protocol definitions into this
/// worker's own context, via a disposable solver whose assertions are never
/// inspected — only the symbol maps they populate in `analysis` matter
/// here. Mirrors the state a forked process would already have inherited.
fn seed_worker_context<'z>(sys: &TypeSystem<'z>, analysis: &mut AnalysisContext<'z>, inputs: &WorkerInputs) {
    let seed_solver = Solver::new(sys.ctx());
    crate::prior_types::apply_all(&inputs.priors, sys, &seed_solver, analysis);

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(%err, "could not start worker's protocol-loading runtime");
            return;
        }
    };
    if let Err(err) = rt.block_on(crate::protocol::load_message_definitions(&inputs.protocol_src, sys, &seed_solver, analysis)) {
        tracing::warn!(%err, "worker could not reload protocol definitions");
    }

    analysis.take_tu_assertions();
}

/// Parses one translation unit and walks it, producing a [`SerializedTu`].
/// Returns `None` (logging a WARNING) on a parse failure, matching the
/// original's "skip and keep going" handling of translation-unit load
/// errors.
fn parse_and_walk<'z>(
    index: &Index<'_>,
    sys: &TypeSystem<'z>,
    analysis: &mut AnalysisContext<'z>,
    unit: &CompileUnit,
) -> Option<SerializedTu> {
    let full_path = unit.full_path();
    let filename_str = unit.filename.to_string_lossy().into_owned();
    let filtered_args: Vec<&str> =
        unit.arguments.iter().map(String::as_str).filter(|a| *a != filename_str).collect();

    let tu = index
        .parser(&full_path)
        .arguments(&filtered_args)
        .parse();
    let tu = match tu {
        Ok(tu) => tu,
        Err(_) => {
            tracing::warn!(path = %full_path.display(), "could not parse translation unit");
            return None;
        }
    };

    for diag in tu.get_diagnostics() {
        tracing::debug!(path = %full_path.display(), diagnostic = %diag.get_text(), "parser diagnostic");
    }

    let ignore_locations = ast::get_ignore_lines(tu.get_entity());
    let tu_solver = Solver::new(sys.ctx());
    let mut walker = Walker::new(sys, &tu_solver, analysis, &ignore_locations);
    walker.walk_translation_unit(tu.get_entity());
    tracing::debug!(path = %full_path.display(), ignored = walker.ignored, exprs = walker.num_exprs, "walked translation unit");

    let labels = analysis.take_tu_assertions();
    Some(SerializedTu::new(full_path.to_string_lossy().into_owned(), tu_solver.to_smt2(), labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_unit_joins_relative_filename() {
        let unit = CompileUnit {
            directory: PathBuf::from("/src"),
            filename: PathBuf::from("a.cpp"),
            arguments: vec![],
        };
        assert_eq!(unit.full_path(), PathBuf::from("/src/a.cpp"));
    }

    #[test]
    fn compile_unit_keeps_absolute_filename() {
        let unit = CompileUnit {
            directory: PathBuf::from("/src"),
            filename: PathBuf::from("/abs/a.cpp"),
            arguments: vec![],
        };
        assert_eq!(unit.full_path(), PathBuf::from("/abs/a.cpp"));
    }
}
