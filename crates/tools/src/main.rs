use std::env;
use std::path::PathBuf;

use foundation::bounds::GeoBounds;
use foundation::geo::GeoPoint;
use formats::store;
use spatial::feature::FeatureKind;
use spatial::rtree::PointRTree;
use spatial::snapshot::IndexSnapshot;

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "pack" => cmd_pack(args),
        "query" => cmd_query(args),
        "info" => cmd_info(args),
        _ => Err(usage()),
    }
}

fn cmd_pack(args: Vec<String>) -> Result<(), String> {
    // geoindex pack <input.geojson> <output.json> --kind country|city [--name NAME]
    if args.len() < 2 {
        return Err(usage());
    }

    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);

    let mut kind: Option<FeatureKind> = None;
    let mut name: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--kind" => {
                i += 1;
                if i >= args.len() {
                    return Err("--kind requires a value".to_string());
                }
                kind = Some(
                    FeatureKind::parse(&args[i])
                        .ok_or_else(|| format!("--kind must be country or city, got {}", args[i]))?,
                );
            }
            "--name" => {
                i += 1;
                if i >= args.len() {
                    return Err("--name requires a value".to_string());
                }
                name = Some(args[i].clone());
            }
            other => {
                return Err(format!("unknown arg: {other}\n\n{}", usage()));
            }
        }
        i += 1;
    }

    let Some(kind) = kind else {
        return Err(format!("pack requires --kind\n\n{}", usage()));
    };
    let name = name.unwrap_or_else(|| {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("collection")
            .to_string()
    });

    let parsed = store::load_collection(&input, kind).map_err(|e| e.to_string())?;
    for warning in &parsed.warnings {
        eprintln!("skipped: {warning}");
    }

    let (tree, build_warnings) = PointRTree::build(parsed.features);
    for warning in &build_warnings {
        eprintln!("excluded: {warning}");
    }

    let snapshot = IndexSnapshot::from_tree(&tree, name);
    store::save_snapshot(&output, &snapshot).map_err(|e| e.to_string())?;

    eprintln!(
        "wrote {} ({} features, blake3={})",
        output.display(),
        snapshot.feature_count,
        snapshot.content_hash
    );
    Ok(())
}

fn cmd_query(args: Vec<String>) -> Result<(), String> {
    // geoindex query <snapshot.json> <min_lon> <min_lat> <max_lon> <max_lat>
    if args.len() != 5 {
        return Err(usage());
    }

    let path = PathBuf::from(&args[0]);
    let mut coords = [0.0_f64; 4];
    for (slot, raw) in coords.iter_mut().zip(&args[1..]) {
        *slot = raw
            .parse::<f64>()
            .map_err(|_| format!("bounds coordinate must be a number, got {raw}"))?;
    }
    let bounds = GeoBounds::from_corners(
        GeoPoint::new(coords[0], coords[1]),
        GeoPoint::new(coords[2], coords[3]),
    );

    let index = store::load_index(&path).map_err(|e| e.to_string())?;
    let hits = index.query(&bounds);
    for feature in &hits {
        println!(
            "{}\t{}\t{}\t{},{}",
            feature.id,
            feature.kind.as_str(),
            feature.name,
            feature.position.lon_deg,
            feature.position.lat_deg
        );
    }
    eprintln!("{} of {} features matched", hits.len(), index.len());
    Ok(())
}

fn cmd_info(args: Vec<String>) -> Result<(), String> {
    // geoindex info <snapshot.json>
    if args.len() != 1 {
        return Err(usage());
    }

    let path = PathBuf::from(&args[0]);
    let snapshot = store::load_snapshot(&path).map_err(|e| e.to_string())?;
    println!("name: {}", snapshot.name);
    println!("version: {}", snapshot.version);
    println!("features: {}", snapshot.feature_count);
    println!("blake3: {}", snapshot.content_hash);

    // Loading proves the snapshot is structurally sound, not just parseable.
    match PointRTree::from_snapshot(&snapshot) {
        Ok(_) => println!("status: ok"),
        Err(e) => println!("status: {e}"),
    }
    Ok(())
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "geoindex".to_string());
    format!(
        "Usage:\n  {exe} pack <input.geojson> <output.json> --kind country|city [--name NAME]\n  {exe} query <snapshot.json> <min_lon> <min_lat> <max_lon> <max_lat>\n  {exe} info <snapshot.json>\n\nNotes:\n- pack skips malformed features and reports them on stderr.\n- query prints matching features to stdout, one per line.\n- info verifies the snapshot structure and content hash.\n"
    )
}
