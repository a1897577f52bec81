//! Instance URI type naming a managed database instance.
//!
//! The canonical form is
//! `projects/<project>/locations/<region>/clusters/<cluster>/instances/<name>`.
//! The project may be domain-scoped, e.g. `example.com:my-project`.

use std::convert::TryFrom;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

const PROJECTS: &str = "projects";
const LOCATIONS: &str = "locations";
const CLUSTERS: &str = "clusters";
const INSTANCES: &str = "instances";

/// Identifies a single database instance within a cluster.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InstanceUri {
    project: String,
    region: String,
    cluster: String,
    name: String,
}

/// An error that can arise parsing an [`InstanceUri`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum InstanceUriError {
    /// An empty string cannot be parsed as an instance URI.
    #[error("instance uri cannot be empty")]
    Empty,

    /// The input does not follow the
    /// `projects/<project>/locations/<region>/clusters/<cluster>/instances/<name>` layout.
    #[error(
        "invalid instance uri {0:?}, expected \
         projects/<project>/locations/<region>/clusters/<cluster>/instances/<name>"
    )]
    BadFormat(String),

    /// One of the four named components is empty.
    #[error("instance uri component `{0}` cannot be empty")]
    EmptyComponent(&'static str),

    /// A component contains a `/`, or a component other than the project contains a `:`.
    #[error("instance uri component `{0}` contains a disallowed character")]
    BadComponentChar(&'static str),

    /// The project is domain-scoped with more than one `:`, or one side of the `:` is empty.
    #[error("invalid domain-scoped project {0:?}")]
    BadProject(String),
}

impl InstanceUri {
    /// Parses an instance URI from its canonical string form.
    ///
    /// # Errors
    ///
    /// Returns an [`InstanceUriError`] if the input is not a well-formed instance URI.
    ///
    /// # Examples
    ///
    /// ```
    /// use alloydb_connector::InstanceUri;
    ///
    /// let uri = InstanceUri::new(
    ///     "projects/my-project/locations/us-central1/clusters/my-cluster/instances/my-instance",
    /// )
    /// .unwrap();
    /// assert_eq!("my-project", uri.project());
    /// assert_eq!("us-central1", uri.region());
    /// assert_eq!("my-cluster", uri.cluster());
    /// assert_eq!("my-instance", uri.name());
    /// ```
    pub fn new(uri: &str) -> Result<Self, InstanceUriError> {
        if uri.is_empty() {
            return Err(InstanceUriError::Empty);
        }

        let segments: Vec<&str> = uri.split('/').collect();
        let [p, project, l, region, c, cluster, i, name] = segments.as_slice() else {
            return Err(InstanceUriError::BadFormat(uri.to_string()));
        };

        if *p != PROJECTS || *l != LOCATIONS || *c != CLUSTERS || *i != INSTANCES {
            return Err(InstanceUriError::BadFormat(uri.to_string()));
        }

        validate_project(project)?;
        validate_component("region", region)?;
        validate_component("cluster", cluster)?;
        validate_component("instance", name)?;

        Ok(InstanceUri {
            project: (*project).to_string(),
            region: (*region).to_string(),
            cluster: (*cluster).to_string(),
            name: (*name).to_string(),
        })
    }

    /// Builds an instance URI from its components, validating each of them.
    ///
    /// # Errors
    ///
    /// Returns an [`InstanceUriError`] if any component is empty or contains
    /// characters not allowed in that position.
    pub fn from_parts(
        project: &str,
        region: &str,
        cluster: &str,
        name: &str,
    ) -> Result<Self, InstanceUriError> {
        validate_project(project)?;
        validate_component("region", region)?;
        validate_component("cluster", cluster)?;
        validate_component("instance", name)?;

        Ok(InstanceUri {
            project: project.to_string(),
            region: region.to_string(),
            cluster: cluster.to_string(),
            name: name.to_string(),
        })
    }

    /// Returns the project ID, including the domain prefix if any.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the region (location) of the instance.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the cluster the instance belongs to.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Returns the instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent cluster path,
    /// e.g. `projects/p/locations/r/clusters/c`.
    pub fn cluster_path(&self) -> String {
        format!(
            "{PROJECTS}/{}/{LOCATIONS}/{}/{CLUSTERS}/{}",
            self.project, self.region, self.cluster
        )
    }
}

fn validate_component(component: &'static str, value: &str) -> Result<(), InstanceUriError> {
    if value.is_empty() {
        return Err(InstanceUriError::EmptyComponent(component));
    }
    if value.contains(['/', ':']) {
        return Err(InstanceUriError::BadComponentChar(component));
    }
    Ok(())
}

fn validate_project(project: &str) -> Result<(), InstanceUriError> {
    if project.is_empty() {
        return Err(InstanceUriError::EmptyComponent("project"));
    }
    if project.contains('/') {
        return Err(InstanceUriError::BadComponentChar("project"));
    }

    let mut parts = project.split(':');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), None, None) => true,
        (Some(domain), Some(id), None) => !domain.is_empty() && !id.is_empty(),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(InstanceUriError::BadProject(project.to_string()))
    }
}

impl Display for InstanceUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{INSTANCES}/{}", self.cluster_path(), self.name)
    }
}

impl FromStr for InstanceUri {
    type Err = InstanceUriError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        Self::new(uri)
    }
}

impl TryFrom<&str> for InstanceUri {
    type Error = InstanceUriError;

    fn try_from(uri: &str) -> Result<Self, Self::Error> {
        Self::new(uri)
    }
}

impl TryFrom<String> for InstanceUri {
    type Error = InstanceUriError;

    fn try_from(uri: String) -> Result<Self, Self::Error> {
        Self::new(uri.as_ref())
    }
}
