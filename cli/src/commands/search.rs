use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use georange_core::{
    config::Config,
    import::import_ndjson,
    index::ZoomLevel,
    query::{Predicate, Strategy},
    region::{geojson::read_polygon, Region},
    SpatialQuery,
};
use humantime::format_duration;

use super::{
    coordinate_error::{parse_coordinate, parse_ring},
    open_index,
};

/// Search for points inside a region
#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(subcommand)]
    pub region: RegionArgs,

    /// Import points from a newline-delimited JSON file before searching
    #[arg(long, global = true)]
    pub load: Option<PathBuf>,

    /// Precision of the covering (`high', `medium' or `low')
    #[arg(long, global = true)]
    pub zoom: Option<ZoomLevel>,

    /// Maximum number of cell ranges to query
    #[arg(long, global = true)]
    pub max_cells: Option<usize>,

    /// How to query the ranges (`compound_or' or `fan_out_union')
    #[arg(long, global = true)]
    pub strategy: Option<Strategy>,

    /// An additional JSON condition, e.g. `{"$eq":{"value.type":"International"}}'
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Return all candidates without removing false positives
    #[arg(long, global = true)]
    pub inexact: bool,

    /// Print the covering and the generated predicates to stderr
    #[arg(long, global = true)]
    pub explain: bool,
}

#[derive(Subcommand, Debug)]
pub enum RegionArgs {
    /// A bounding box given by two opposite corners
    Bbox {
        /// First corner as `lat,lon'
        #[arg(allow_hyphen_values = true)]
        lower_left: String,

        /// Second corner as `lat,lon'
        #[arg(allow_hyphen_values = true)]
        upper_right: String,
    },

    /// A circle around a center
    Circle {
        /// Center as `lat,lon'
        #[arg(allow_hyphen_values = true)]
        center: String,

        /// Radius in meters
        radius: f64,
    },

    /// A polygon given as a list of vertices or read from a GeoJSON file
    Polygon {
        /// Whitespace-separated list of `lat,lon' vertices
        #[arg(
            allow_hyphen_values = true,
            required_unless_present = "geojson",
            conflicts_with = "geojson"
        )]
        ring: Option<String>,

        /// Read the polygon from a GeoJSON file (a geometry, a Feature, a
        /// FeatureCollection, or one document per line)
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Select the document with this `code' from the GeoJSON file
        #[arg(long, requires = "geojson")]
        code: Option<String>,
    },
}

impl RegionArgs {
    fn to_region(&self) -> Result<Region> {
        let region = match self {
            RegionArgs::Bbox {
                lower_left,
                upper_right,
            } => Region::bounding_box(parse_coordinate(lower_left)?, parse_coordinate(upper_right)?)?,
            RegionArgs::Circle { center, radius } => {
                Region::circle(parse_coordinate(center)?, *radius)?
            }
            RegionArgs::Polygon {
                geojson: Some(path),
                code,
                ..
            } => {
                let file = File::open(path)
                    .with_context(|| format!("Unable to open file `{}'", path.display()))?;
                read_polygon(BufReader::new(file), code.as_deref())
                    .with_context(|| format!("Unable to read polygon from `{}'", path.display()))?
            }
            RegionArgs::Polygon {
                ring: Some(ring), ..
            } => Region::polygon(parse_ring(ring)?)?,
            RegionArgs::Polygon { .. } => bail!("Either a ring or a GeoJSON file is required"),
        };
        Ok(region)
    }
}

/// Run the `search` command
pub fn run_search(args: SearchArgs, config: &Config) -> Result<()> {
    let region = args.region.to_region()?;

    let index = open_index(config)?;

    if let Some(load) = &args.load {
        let file = File::open(load)
            .with_context(|| format!("Unable to open file `{}'", load.display()))?;
        let count = import_ndjson(&index, BufReader::new(file))?;
        eprintln!("Loaded {count} points");
    }

    let mut query = SpatialQuery::new(region, &config.query);
    if let Some(zoom) = args.zoom {
        query.zoom_level = zoom;
    }
    if let Some(max_cells) = args.max_cells {
        query.max_cells = max_cells;
    }
    if args.strategy.is_some() {
        query.strategy = args.strategy;
    }
    if args.inexact {
        query.exact = false;
    }
    if let Some(filter) = &args.filter {
        let doc = serde_json::from_str(filter).context("Filter must be valid JSON")?;
        query = query.with_filter(Predicate::from_json(&doc)?);
    }

    let search_start = Instant::now();

    if args.explain {
        let plan = index.plan(&query)?;
        eprintln!(
            "Covering with {} ranges ({} ids), strategy {}",
            plan.covering.len(),
            plan.covering.span(),
            plan.strategy
        );
        for r in plan.covering.ranges() {
            eprintln!("  [{}, {}]", r.min, r.max);
        }
        for p in &plan.predicates {
            eprintln!("{}", p.to_json());
        }
    }

    let points = index.query(&query)?;

    let stdout = io::stdout().lock();
    let mut writer = BufWriter::new(stdout);
    for p in &points {
        serde_json::to_writer(&mut writer, p)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    eprintln!(
        "Found {} points in {}",
        points.len(),
        format_duration(Duration::from_millis(
            search_start.elapsed().as_millis() as u64
        ))
    );

    index.close()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertor::{assert_that, EqualityAssertion, ResultAssertion, StringAssertion};
    use clap::Parser;
    use georange_core::region::{lat_lon, Region};
    use tempdir::TempDir;

    use super::RegionArgs;

    #[derive(Parser, Debug)]
    struct Args {
        #[command(subcommand)]
        region: RegionArgs,
    }

    fn region(args: &[&str]) -> anyhow::Result<Region> {
        let args = Args::try_parse_from(["search"].iter().chain(args))?;
        args.region.to_region()
    }

    #[test]
    fn polygon_from_geojson() {
        let dir = TempDir::new("georange_search").unwrap();
        let path = dir.path().join("states.json");
        fs::write(
            &path,
            concat!(
                r#"{"name":"Wyoming","code":"WY","loc":{"type":"Polygon","coordinates":[[[-111.0,45.0],[-104.0,45.0],[-104.0,41.0],[-111.0,41.0],[-111.0,45.0]]]}}"#,
                "\n",
                r#"{"name":"Colorado","code":"CO","loc":{"type":"Polygon","coordinates":[[[-109.0,41.0],[-102.0,41.0],[-102.0,37.0],[-109.0,37.0],[-109.0,41.0]]]}}"#,
                "\n",
            ),
        )
        .unwrap();
        let path = path.to_str().unwrap();

        let co = region(&["polygon", "--geojson", path, "--code", "CO"]).unwrap();
        assert_that!(co).is_equal_to(Region::Polygon {
            ring: vec![
                lat_lon(41.0, -109.0),
                lat_lon(41.0, -102.0),
                lat_lon(37.0, -102.0),
                lat_lon(37.0, -109.0),
            ],
        });

        let first = region(&["polygon", "--geojson", path]).unwrap();
        assert_that!(first).is_equal_to(Region::Polygon {
            ring: vec![
                lat_lon(45.0, -111.0),
                lat_lon(45.0, -104.0),
                lat_lon(41.0, -104.0),
                lat_lon(41.0, -111.0),
            ],
        });

        let missing = region(&["polygon", "--geojson", path, "--code", "TX"]);
        assert_that!(format!("{:#}", missing.unwrap_err())).contains("TX");
    }

    #[test]
    fn polygon_arguments() {
        let ring = region(&["polygon", "0,0 0,2 2,1"]).unwrap();
        assert_that!(ring.kind()).is_equal_to("polygon");

        assert_that!(region(&["polygon"])).is_err();
        assert_that!(region(&["polygon", "--code", "CO"])).is_err();
        assert_that!(region(&["polygon", "0,0 0,2 2,1", "--geojson", "x.json"])).is_err();
    }
}
