//! `proxygen`: drive the class proxy generator over JSON type manifests

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use proxy_core::{
    interceptor_fn, CacheStats, GeneratedProxyType, GeneratorConfig, ProxyGenerationOptions,
    ProxyGenerator,
};
use proxy_model::{core_types, TypeExpr, TypeHandle, TypeManifest, TypeRef, TypeRegistry, TypeSpec};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("proxygen")
        .version(proxy_core::VERSION)
        .about("Runtime class proxy generator")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Generator configuration (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("Create a proxy of one manifest type and describe it")
                .arg(manifest_arg().required(true))
                .arg(type_arg())
                .arg(
                    Arg::new("args")
                        .long("args")
                        .default_value("[]")
                        .help("Constructor arguments as a JSON array"),
                )
                .arg(
                    Arg::new("interfaces")
                        .long("interfaces")
                        .num_args(1..)
                        .action(ArgAction::Append)
                        .help("Additional interfaces to implement"),
                )
                .arg(
                    Arg::new("call")
                        .long("call")
                        .action(ArgAction::Append)
                        .help("Invoke a parameterless member on the proxy"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Race proxy type generation for one type across threads")
                .arg(manifest_arg().required(true))
                .arg(type_arg())
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Worker threads"),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .default_value("1000")
                        .value_parser(value_parser!(usize))
                        .help("Generation requests"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Generate proxies for every class in a manifest and report cache statistics")
                .arg(manifest_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn manifest_arg() -> Arg {
    Arg::new("manifest")
        .long("manifest")
        .value_parser(value_parser!(PathBuf))
        .help("Type manifest (JSON)")
}

fn type_arg() -> Arg {
    Arg::new("type")
        .long("type")
        .required(true)
        .help("Target type: a full name or a JSON type expression")
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    let generator = ProxyGenerator::new(config);

    match matches.subcommand() {
        Some(("generate", args)) => generate(&generator, args),
        Some(("stress", args)) => stress(&generator, args),
        Some(("report", args)) => report(&generator, args),
        _ => Ok(()),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_registry(path: Option<&PathBuf>) -> Result<(TypeRegistry, Vec<TypeHandle>)> {
    let registry = TypeRegistry::new();
    let Some(path) = path else {
        return Ok((registry, Vec::new()));
    };
    let loaded = read_manifest(path)?
        .load_into(&registry)
        .with_context(|| format!("loading types from {}", path.display()))?;
    tracing::info!("Loaded {} types from {}", loaded.len(), path.display());
    Ok((registry, loaded))
}

fn read_manifest(path: &Path) -> Result<TypeManifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    TypeManifest::from_json_str(&text).with_context(|| format!("parsing manifest {}", path.display()))
}

fn resolve_type(registry: &TypeRegistry, text: &str) -> Result<TypeHandle> {
    let expr = if text.trim_start().starts_with('{') {
        serde_json::from_str(text).with_context(|| format!("parsing type expression {text}"))?
    } else {
        TypeExpr::Name(text.to_string())
    };
    match registry.resolve(&expr, &[])? {
        TypeRef::Type(handle) => Ok(handle),
        other => bail!("{other} is not a class, interface or generic instantiation"),
    }
}

fn generate(generator: &ProxyGenerator, args: &ArgMatches) -> Result<()> {
    let (registry, _) = load_registry(args.get_one::<PathBuf>("manifest"))?;
    let target = resolve_type(&registry, required(args, "type")?)?;
    let interfaces = args
        .get_many::<String>("interfaces")
        .into_iter()
        .flatten()
        .map(|name| resolve_type(&registry, name))
        .collect::<Result<Vec<_>>>()?;
    let json: serde_json::Value =
        serde_json::from_str(required(args, "args")?).context("parsing --args")?;
    let arguments = registry.values_from_json(&json)?;

    let tracer = interceptor_fn(|invocation| {
        tracing::info!(
            "-> {}.{}",
            invocation.declaring_type().full_name(),
            invocation.member().signature()
        );
        invocation.proceed()?;
        tracing::info!("<- {}", invocation.return_value());
        Ok(())
    });

    let proxy = generator.create_class_proxy_with(
        &target,
        &interfaces,
        &ProxyGenerationOptions::default(),
        arguments,
        vec![tracer],
    )?;

    print_proxy_type(proxy.proxy_type());
    println!("Constructed With: {}", proxy.constructed_with());
    if let Some(label) = proxy.field(proxy_model::CONSTRUCTOR_CALLED_FIELD) {
        println!("Constructor Called: {label}");
    }

    for member in args.get_many::<String>("call").into_iter().flatten() {
        let result = proxy
            .invoke(member, Vec::new())
            .with_context(|| format!("invoking {member}"))?;
        println!("{member}() = {result}");
    }
    Ok(())
}

fn print_proxy_type(proxy_type: &GeneratedProxyType) {
    println!("Proxy Type: {}", proxy_type.full_name());
    println!("  Id: {}", proxy_type.id());
    println!("  Base: {}", proxy_type.base_type().full_name());
    println!("  Fingerprint: {}", proxy_type.descriptor().fingerprint().short());
    for iface in proxy_type.interfaces() {
        println!("  Implements: {}", iface.full_name());
    }
    for ctor in proxy_type.constructors() {
        println!("  Constructor: {}", ctor.signature);
    }
    for (signature, slot) in proxy_type.dispatch_table() {
        println!("  {:?}: {} (from {})", slot.mode, signature, slot.declaring_type.full_name());
    }
}

fn stress(generator: &ProxyGenerator, args: &ArgMatches) -> Result<()> {
    let threads = *args.get_one::<usize>("threads").unwrap_or(&8);
    let iterations = *args.get_one::<usize>("iterations").unwrap_or(&1000);
    let (registry, _) = load_registry(args.get_one::<PathBuf>("manifest"))?;
    let target = resolve_type(&registry, required(args, "type")?)?;

    println!("Running stress test...");
    println!("Threads: {threads}");
    println!("Iterations: {iterations}");
    println!();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("building thread pool")?;
    let options = ProxyGenerationOptions::default();
    let ids = pool.install(|| {
        (0..iterations)
            .into_par_iter()
            .map(|_| {
                generator
                    .generate_class_proxy_type(&target, &[], &options)
                    .map(|proxy_type| proxy_type.id())
            })
            .collect::<Result<HashSet<_>, _>>()
    })?;

    let stats = generator.cache_stats();
    println!("Stress Test Report:");
    println!("  Distinct Proxy Types: {}", ids.len());
    print_stats(&stats);

    let success = ids.len() == 1;
    println!("  Success: {success}");
    std::process::exit(if success { 0 } else { 1 });
}

#[derive(Debug, Serialize)]
struct Report {
    version: &'static str,
    generation_assembly: String,
    proxies: Vec<ReportEntry>,
    cache: CacheStats,
}

#[derive(Debug, Serialize)]
struct ReportEntry {
    target: String,
    proxy_type: Option<String>,
    error: Option<String>,
}

fn report(generator: &ProxyGenerator, args: &ArgMatches) -> Result<()> {
    let (_registry, loaded) = load_registry(args.get_one::<PathBuf>("manifest"))?;
    let mut targets: Vec<TypeHandle> = loaded
        .into_iter()
        .filter(|ty| ty.kind() == proxy_model::TypeKind::Class)
        .collect();
    if targets.is_empty() {
        targets.push(TypeSpec::make_generic(
            &core_types().list,
            vec![TypeRef::of(&core_types().object)],
        )?);
    }

    let options = ProxyGenerationOptions::default();
    let mut proxies = Vec::with_capacity(targets.len());
    // twice, so the second round is served from the cache
    for round in 0..2 {
        for target in &targets {
            let result = generator.generate_class_proxy_type(target, &[], &options);
            if round == 1 {
                proxies.push(ReportEntry {
                    target: target.full_name(),
                    proxy_type: result.as_ref().ok().map(|t| t.full_name()),
                    error: result.err().map(|e| e.to_string()),
                });
            }
        }
    }

    let report = Report {
        version: proxy_core::VERSION,
        generation_assembly: generator.config().generation_assembly.clone(),
        proxies,
        cache: generator.cache_stats(),
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Proxy Generation Report");
        println!("=======================");
        println!();
        println!("Version: {}", report.version);
        println!("Generation Assembly: {}", report.generation_assembly);
        println!();
        for entry in &report.proxies {
            match (&entry.proxy_type, &entry.error) {
                (Some(name), _) => println!("  ✓ {} -> {}", entry.target, name),
                (None, Some(err)) => println!("  ✗ {}: {}", entry.target, err),
                (None, None) => {}
            }
        }
        println!();
        println!("Cache:");
        print_stats(&report.cache);
    }
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("  Cached Types: {}", stats.entry_count);
    println!("  Hits: {}", stats.hits);
    println!("  Misses: {}", stats.misses);
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}
