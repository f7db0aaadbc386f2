use tracing::{debug, info, instrument};
use ulid::Ulid;

use crate::{
    config::QueryConfig,
    error::{Error, Result},
    index::{CellIndexer, GeometryEngine, ZoomLevel},
    query::{
        Covering, ExactnessFilter, Predicate, RangeQueryBuilder, RegionCoveringClient, Strategy,
    },
    region::{validate_coordinate, Region},
    storage::{
        point::{Location, Point},
        DocumentStore,
    },
};

/// A region query with all its options
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    pub region: Region,
    pub zoom_level: ZoomLevel,
    pub max_cells: usize,
    pub exact: bool,

    /// Chosen based on the store's capabilities if not set
    pub strategy: Option<Strategy>,

    /// An additional condition all results must satisfy
    pub filter: Option<Predicate>,
}

impl SpatialQuery {
    /// Create a query for the given region using the defaults from `config`
    pub fn new(region: Region, config: &QueryConfig) -> Self {
        Self {
            region,
            zoom_level: config.zoom_level,
            max_cells: config.max_cells,
            exact: config.exact,
            strategy: config.strategy,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// What a query will send to the store
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub covering: Covering,
    pub strategy: Strategy,
    pub predicates: Vec<Predicate>,
}

/// A point store with a spatial index over the points' cell ids
pub struct SpatialIndex<S, E> {
    store: S,
    engine: E,
    config: QueryConfig,
}

impl<S, E> SpatialIndex<S, E>
where
    S: DocumentStore,
    E: GeometryEngine,
{
    pub fn new(store: S, engine: E, config: QueryConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Index a new point and assign it a fresh id
    pub fn index_point(&self, lat: f64, lon: f64, payload: serde_json::Value) -> Result<Point> {
        self.index_point_with_id(Ulid::new().to_string(), lat, lon, payload)
    }

    /// Index a new point with the given id. Fails if the id exists.
    #[instrument(skip(self, payload))]
    pub fn index_point_with_id(
        &self,
        id: String,
        lat: f64,
        lon: f64,
        payload: serde_json::Value,
    ) -> Result<Point> {
        let point = CellIndexer::new(&self.engine).point(id, lat, lon, payload)?;
        self.store.insert(point.clone()).map_err(Error::store)?;
        debug!(cell_id = point.cell_id, "Indexed point");
        Ok(point)
    }

    /// Insert a complete point. Its cell id must be the id of a leaf cell
    /// and, if the point has a location, the id of the cell containing it.
    pub fn insert_point(&self, point: Point) -> Result<()> {
        self.validate(&point)?;
        self.store.insert(point).map_err(Error::store)
    }

    fn validate(&self, point: &Point) -> Result<()> {
        let is_leaf = self
            .engine
            .cell_center(point.cell_id)
            .and_then(|c| self.engine.cell_id_for_point(c.y, c.x).ok())
            == Some(point.cell_id);
        if !is_leaf {
            return Err(Error::invalid_geometry(format!(
                "`{}' is not the id of a leaf cell (point `{}')",
                point.cell_id, point.id
            )));
        }

        if let Some(loc) = point.location {
            validate_coordinate(loc.lat, loc.lon)?;
            if self.engine.cell_id_for_point(loc.lat, loc.lon)? != point.cell_id {
                return Err(Error::InvalidCoordinate {
                    lat: loc.lat,
                    lon: loc.lon,
                });
            }
        }

        Ok(())
    }

    /// Look up a point by its id
    pub fn get_point(&self, id: &str) -> Result<Option<Point>> {
        self.store.get(id).map_err(Error::store)
    }

    /// Move an existing point to new coordinates. The point is deleted and
    /// inserted again with a new cell id. Returns `None` if there is no
    /// point with the given id.
    #[instrument(skip(self))]
    pub fn relocate_point(&self, id: &str, lat: f64, lon: f64) -> Result<Option<Point>> {
        let cell_id = CellIndexer::new(&self.engine).index_of(lat, lon)?;
        let Some(mut point) = self.get_point(id)? else {
            return Ok(None);
        };

        self.store.delete(id).map_err(Error::store)?;
        point.cell_id = cell_id;
        point.location = Some(Location { lat, lon });
        self.store.insert(point.clone()).map_err(Error::store)?;
        Ok(Some(point))
    }

    pub fn delete_point(&self, id: &str) -> Result<()> {
        self.store.delete(id).map_err(Error::store)
    }

    /// Find all points in the region
    pub fn query_region(
        &self,
        region: &Region,
        zoom_level: ZoomLevel,
        max_cells: usize,
        exact: bool,
    ) -> Result<Vec<Point>> {
        let mut query = SpatialQuery::new(region.clone(), &self.config);
        query.zoom_level = zoom_level;
        query.max_cells = max_cells;
        query.exact = exact;
        self.query(&query)
    }

    /// Compute the covering and the predicates for a query without running
    /// it
    pub fn plan(&self, query: &SpatialQuery) -> Result<QueryPlan> {
        let covering = RegionCoveringClient::new(&self.engine).cover(
            &query.region,
            query.zoom_level,
            query.max_cells,
        )?;
        let strategy = query
            .strategy
            .unwrap_or_else(|| Strategy::for_store(&self.store));

        let builder = RangeQueryBuilder::new(&covering).with_filter(query.filter.as_ref());
        let predicates = match strategy {
            Strategy::CompoundOr => builder.compound_predicate().into_iter().collect(),
            Strategy::FanOutUnion => builder.range_predicates(),
        };

        Ok(QueryPlan {
            covering,
            strategy,
            predicates,
        })
    }

    /// Run a query
    #[instrument(skip_all, fields(region = query.region.kind(), zoom = %query.zoom_level))]
    pub fn query(&self, query: &SpatialQuery) -> Result<Vec<Point>> {
        let plan = self.plan(query)?;

        let candidates = RangeQueryBuilder::new(&plan.covering)
            .with_filter(query.filter.as_ref())
            .execute(&self.store, plan.strategy, self.config.parallelism)?;

        if !query.exact {
            return Ok(candidates);
        }

        Ok(ExactnessFilter::new(&self.engine).filter(candidates, &query.region))
    }

    /// Delete all points. Returns the number of deleted points.
    pub fn purge(&self) -> Result<usize> {
        let ids = self
            .store
            .find()
            .map_err(Error::store)?
            .map(|p| p.map(|p| p.id))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(Error::store)?;

        for id in &ids {
            self.store.delete(id).map_err(Error::store)?;
        }
        self.store.flush().map_err(Error::store)?;

        info!(deleted = ids.len(), "Purged store");
        Ok(ids.len())
    }

    pub fn close(self) -> Result<()> {
        self.store.close().map_err(Error::store)
    }
}
