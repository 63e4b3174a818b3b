//! Environment readiness check.

use anyhow::Result;
use court_vision::TesseractCli;

use crate::cli::output::{is_json, print_json};
use crate::cli::GlobalOptions;

/// Check configuration, OCR availability and writable state directories.
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let config = match opts.load_config() {
        Ok(config) => config,
        Err(e) => {
            println!("[!!] Configuration: {e:#}");
            println!();
            println!("Status: NOT READY");
            return Ok(());
        }
    };

    let tesseract = TesseractCli::locate(config.captcha.tesseract_path.as_deref());
    let cache_dir = config.resolved_cache_dir();
    let cache_ok = std::fs::create_dir_all(&cache_dir).is_ok();
    let audit_log = config.resolved_audit_log();

    if is_json() {
        print_json(&serde_json::json!({
            "portals": config.enabled_portals().collect::<Vec<_>>(),
            "tesseract": tesseract.as_ref().ok().map(|t| t.binary().display().to_string()),
            "captcha_enabled": config.captcha.enabled,
            "cache_dir": cache_dir,
            "cache_writable": cache_ok,
            "audit_log": audit_log,
            "ready": cache_ok,
        }));
        return Ok(());
    }

    println!("Court Doctor");
    println!("============");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    for portal in config.enabled_portals() {
        println!("[OK] Portal {}: {}", portal.kind.id(), portal.base_url);
    }
    println!(
        "[..] Pacing: {} ms + up to {} ms jitter, {} retries every {} ms",
        config.request_delay_ms, config.jitter_ms, config.max_retries, config.retry_interval_ms
    );

    match (&tesseract, config.captcha.enabled) {
        (_, false) => println!("[..] Challenge solving disabled in config"),
        (Ok(t), true) => println!("[OK] tesseract found: {}", t.binary().display()),
        (Err(e), true) => println!("[!!] {e}. Challenged portals will fall through."),
    }

    if cache_ok {
        println!("[OK] Cache dir: {}", cache_dir.display());
    } else {
        println!("[!!] Cache dir not writable: {}", cache_dir.display());
    }
    println!("[..] Audit log: {}", audit_log.display());

    println!();
    println!("Status: {}", if cache_ok { "READY" } else { "NOT READY" });
    Ok(())
}
