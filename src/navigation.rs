// src/navigation.rs
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wizard screens, keyed by the analysis id where the screen needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    VinEntry,
    CarParameters(i64),
    PhotoInstructions(i64),
    UploadPhotos(i64),
    Analyzing(i64),
    AnalysisResults(i64),
    NotFound,
}

impl Route {
    pub fn analyse_id(&self) -> Option<i64> {
        match *self {
            Route::CarParameters(id)
            | Route::PhotoInstructions(id)
            | Route::UploadPhotos(id)
            | Route::Analyzing(id)
            | Route::AnalysisResults(id) => Some(id),
            Route::VinEntry | Route::NotFound => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::VinEntry => write!(f, "/"),
            Route::CarParameters(id) => write!(f, "/car-parameters/{}", id),
            Route::PhotoInstructions(id) => write!(f, "/photo-instructions/{}", id),
            Route::UploadPhotos(id) => write!(f, "/upload-photos/{}", id),
            Route::Analyzing(id) => write!(f, "/analyzing/{}", id),
            Route::AnalysisResults(id) => write!(f, "/analysis-results/{}", id),
            Route::NotFound => write!(f, "/not-found"),
        }
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    /// Anything that matches no screen resolves to `NotFound`, like a catch-all.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Route::VinEntry,
            [screen, id] => match id.parse::<i64>() {
                Ok(id) => match *screen {
                    "car-parameters" => Route::CarParameters(id),
                    "photo-instructions" => Route::PhotoInstructions(id),
                    "upload-photos" => Route::UploadPhotos(id),
                    "analyzing" => Route::Analyzing(id),
                    "analysis-results" => Route::AnalysisResults(id),
                    _ => Route::NotFound,
                },
                Err(_) => Route::NotFound,
            },
            _ => Route::NotFound,
        };

        Ok(route)
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_render_and_parse_back() {
        let routes = [
            Route::VinEntry,
            Route::CarParameters(12345),
            Route::PhotoInstructions(12345),
            Route::UploadPhotos(12345),
            Route::Analyzing(12345),
            Route::AnalysisResults(12345),
        ];
        for route in routes {
            assert_eq!(route.to_string().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn unknown_paths_fall_through_to_not_found() {
        for path in ["/pricing", "/analyzing/abc", "/analyzing/1/extra", "/upload-photos"] {
            assert_eq!(path.parse::<Route>().unwrap(), Route::NotFound, "{path}");
        }
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let route: Route = "/analysis-results/42#left".parse().unwrap();
        assert_eq!(route, Route::AnalysisResults(42));
        assert_eq!(route.analyse_id(), Some(42));
        assert_eq!("/?x=1".parse::<Route>().unwrap(), Route::VinEntry);
    }
}
