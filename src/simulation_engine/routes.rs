// routes.rs
//
// Loads route geometries from a directory of CSV files. Each file is one
// route, each line one `x,y` point. Files are visited in file-name order so
// route identifiers are stable across platforms; identifiers are assigned
// densely starting at 1.

use crate::communication::messages::Point;
use crate::error::{Result, SimulationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Identifier of a loaded route, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u32);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route {}", self.0)
    }
}

/// An immutable ordered sequence of points. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub source: PathBuf,
    points: Vec<Point>,
}

impl Route {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns the point at a 1-based position along the route.
    pub fn point_at(&self, position: usize) -> Option<Point> {
        position
            .checked_sub(1)
            .and_then(|index| self.points.get(index))
            .copied()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteStore {
    routes: Vec<Route>,
}

impl RouteStore {
    /// Loads every file in `directory` as a route.
    ///
    /// Fails if the directory cannot be read, holds no files, or any file is
    /// unreadable, empty or contains a malformed line.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let io_error = |source| SimulationError::Io {
            path: directory.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(directory).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let file_type = entry.file_type().map_err(io_error)?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(SimulationError::EmptyRouteDirectory {
                path: directory.to_path_buf(),
            });
        }

        let mut store = RouteStore::default();
        for path in files {
            let points = parse_route_file(&path)?;
            let id = store.next_id();
            log::debug!("Loaded {} with {} points from {:?}", id, points.len(), path);
            store.routes.push(Route {
                id,
                source: path,
                points,
            });
        }

        log::info!(
            "Loaded {} routes from {:?}",
            store.route_count(),
            directory
        );
        Ok(store)
    }

    /// Builds a store from in-memory point sequences, assigning identifiers
    /// in iteration order.
    pub fn from_point_lists<I>(routes: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<Point>>,
    {
        let mut store = RouteStore::default();
        for points in routes {
            let id = store.next_id();
            let source = PathBuf::from(format!("<memory:{}>", id.0));
            if points.is_empty() {
                return Err(SimulationError::EmptyRoute { path: source });
            }
            store.routes.push(Route { id, source, points });
        }
        Ok(store)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route(&self, id: RouteId) -> Result<&Route> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.routes.get(index))
            .ok_or(SimulationError::RouteNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    fn next_id(&self) -> RouteId {
        RouteId(self.routes.len() as u32 + 1)
    }
}

/// Reads one route file. Blank lines are skipped and anything after the
/// second field of a line is ignored.
fn parse_route_file(path: &Path) -> Result<Vec<Point>> {
    let file = fs::File::open(path).map_err(|source| SimulationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e.position().map(|p| p.line()), e))?;
        let line = record.position().map(|p| p.line());
        let x = parse_coordinate(path, line, record.get(0), "x")?;
        let y = parse_coordinate(path, line, record.get(1), "y")?;
        points.push(Point::new(x, y));
    }

    if points.is_empty() {
        return Err(SimulationError::EmptyRoute {
            path: path.to_path_buf(),
        });
    }
    Ok(points)
}

fn parse_coordinate(
    path: &Path,
    line: Option<u64>,
    field: Option<&str>,
    axis: &str,
) -> Result<f64> {
    let field = field.ok_or_else(|| parse_error(path, line, format!("missing {} value", axis)))?;
    field
        .parse::<f64>()
        .map_err(|e| parse_error(path, line, format!("invalid {} value {:?}: {}", axis, field, e)))
}

fn parse_error(path: &Path, line: Option<u64>, reason: impl ToString) -> SimulationError {
    SimulationError::Parse {
        path: path.to_path_buf(),
        line: line.unwrap_or(0),
        reason: reason.to_string(),
    }
}
