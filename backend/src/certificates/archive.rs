//! # Batch Archiver
//!
//! Renders a certificate for every recipient and packs the PNGs into one flat ZIP
//! archive named after the recipients.
//!
//! Work is split into chunks of `workers` recipients. A chunk renders in parallel on a
//! bounded thread pool; its results are then written to the archive and reported to the
//! progress callback strictly in recipient order. Progress only counts finished
//! certificates and never goes backwards. Any render failure aborts the whole run and no
//! partial archive is returned.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;
use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::error::CertificateError;
use super::render::CertificateRenderer;
use super::settings::CertificateSettings;

/// Extension of every archive entry; the renderer always produces PNG.
pub const ENTRY_EXTENSION: &str = "png";

/// Cooperative cancellation shared between a job and whoever may stop it.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Upper bound on certificates rendered at the same time.
    pub workers: usize,
    pub cancel: CancellationFlag,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            cancel: CancellationFlag::new(),
        }
    }
}

pub struct BatchArchiver<'a> {
    renderer: &'a CertificateRenderer,
    options: BatchOptions,
}

impl<'a> BatchArchiver<'a> {
    pub fn new(renderer: &'a CertificateRenderer, options: BatchOptions) -> Self {
        Self { renderer, options }
    }

    /// Renders every recipient and returns the finished ZIP archive.
    ///
    /// `on_progress(completed, total)` is called once per finished certificate. An empty
    /// recipient list yields a valid archive with no entries and no progress calls.
    pub fn run<F>(
        &self,
        names: &[String],
        settings: &CertificateSettings,
        mut on_progress: F,
    ) -> Result<Vec<u8>, CertificateError>
    where
        F: FnMut(usize, usize),
    {
        let total = names.len();
        let prepared = self.renderer.prepare(settings)?;
        let workers = self.options.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("certgen-render-{}", i))
            .build()
            .map_err(|e| CertificateError::Archive(format!("cannot start render pool: {}", e)))?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let entry_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        let mut entry_names = EntryNames::default();
        let mut completed = 0usize;

        for chunk in names.chunks(workers) {
            if self.options.cancel.is_cancelled() {
                log::info!("batch cancelled after {} of {} certificates", completed, total);
                return Err(CertificateError::Cancelled { completed });
            }

            let rendered: Vec<Result<Vec<u8>, CertificateError>> = pool.install(|| {
                chunk
                    .par_iter()
                    .map(|name| self.renderer.render(name, &prepared))
                    .collect()
            });

            for (name, image) in chunk.iter().zip(rendered) {
                let image = image?;
                let entry = entry_names.allocate(name, completed + 1);
                zip.start_file(entry.as_str(), entry_options)?;
                zip.write_all(&image)
                    .map_err(|e| CertificateError::Archive(e.to_string()))?;

                completed += 1;
                log::debug!("certificate {}/{} written as '{}'", completed, total, entry);
                on_progress(completed, total);
            }
        }

        let archive = zip.finish()?.into_inner();
        log::info!(
            "certificate archive finished: {} entries, {} bytes",
            completed,
            archive.len()
        );
        Ok(archive)
    }
}

/// `round(completed / total * 100)` in integer arithmetic.
///
/// Capped at 99 until the last certificate is written; from 200 recipients on, the
/// penultimate step would otherwise round up to 100.
pub fn progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 || completed >= total {
        return 100;
    }
    let completed = completed as u64;
    let total = total as u64;
    (((200 * completed + total) / (2 * total)) as u32).min(99)
}

/// Keeps letters, digits and whitespace, then trims.
pub fn sanitize_filename(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("static pattern"));
    re.replace_all(name, "").trim().to_string()
}

/// Hands out unique archive entry names.
///
/// The first recipient with a given sanitized name gets `Name.png`, later ones
/// `Name (2).png`, `Name (3).png` and so on. Names with nothing left after sanitizing
/// become `certificate-<position>.png`.
#[derive(Default)]
struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    fn allocate(&mut self, name: &str, position: usize) -> String {
        let mut base = sanitize_filename(name);
        if base.is_empty() {
            base = format!("certificate-{}", position);
        }

        let mut candidate = format!("{}.{}", base, ENTRY_EXTENSION);
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{} ({}).{}", base, n, ENTRY_EXTENSION);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
