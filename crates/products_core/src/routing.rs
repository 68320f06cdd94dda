pub const COLLECTION_RESOURCE: &str = "/products";
pub const ITEM_RESOURCE: &str = "/products/{id}";
pub const ID_PATH_PARAMETER: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePath {
    Collection,
    Item,
}

impl ResourcePath {
    pub fn template(self) -> &'static str {
        match self {
            Self::Collection => COLLECTION_RESOURCE,
            Self::Item => ITEM_RESOURCE,
        }
    }

    fn from_template(resource: &str) -> Option<Self> {
        match resource {
            COLLECTION_RESOURCE => Some(Self::Collection),
            ITEM_RESOURCE => Some(Self::Item),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListProducts,
    CreateProduct,
    GetProduct,
    UpdateProduct,
    DeleteProduct,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListProducts => "list_products",
            Self::CreateProduct => "create_product",
            Self::GetProduct => "get_product",
            Self::UpdateProduct => "update_product",
            Self::DeleteProduct => "delete_product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub resource: ResourcePath,
    pub method: &'static str,
    pub operation: Operation,
}

pub const ROUTE_TABLE: &[RouteEntry] = &[
    RouteEntry {
        resource: ResourcePath::Collection,
        method: "GET",
        operation: Operation::ListProducts,
    },
    RouteEntry {
        resource: ResourcePath::Collection,
        method: "POST",
        operation: Operation::CreateProduct,
    },
    RouteEntry {
        resource: ResourcePath::Item,
        method: "GET",
        operation: Operation::GetProduct,
    },
    RouteEntry {
        resource: ResourcePath::Item,
        method: "PUT",
        operation: Operation::UpdateProduct,
    },
    RouteEntry {
        resource: ResourcePath::Item,
        method: "DELETE",
        operation: Operation::DeleteProduct,
    },
];

/// Transport-independent view of the fields routing needs.
///
/// `resource` is the route template the gateway matched. When it is absent
/// the literal `path` is matched instead and the id is taken from its last
/// segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequest<'a> {
    pub resource: Option<&'a str>,
    pub path: Option<&'a str>,
    pub method: &'a str,
    pub id_parameter: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub operation: Operation,
    pub method: &'static str,
    pub product_id: Option<String>,
}

impl ResolvedRoute {
    /// Log label in request-line form, e.g. `PUT /products/abc`.
    pub fn describe(&self) -> String {
        match &self.product_id {
            Some(id) => format!("{} {COLLECTION_RESOURCE}/{id}", self.method),
            None => format!("{} {COLLECTION_RESOURCE}", self.method),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadRoute {
    method: String,
    target: String,
}

impl BadRoute {
    fn new(method: &str, target: Option<&str>) -> Self {
        Self {
            method: method.to_string(),
            target: target.unwrap_or("<none>").to_string(),
        }
    }
}

impl std::fmt::Display for BadRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no route for {} {}", self.method, self.target)
    }
}

impl std::error::Error for BadRoute {}

pub fn resolve_route(request: &RouteRequest<'_>) -> Result<ResolvedRoute, BadRoute> {
    let (resource, literal_id) = match request.resource {
        Some(template) => (ResourcePath::from_template(template), None),
        None => match request.path.map(match_literal_path) {
            Some(Some((resource, id))) => (Some(resource), id),
            _ => (None, None),
        },
    };

    let bad_route = || BadRoute::new(request.method, request.resource.or(request.path));
    let resource = resource.ok_or_else(bad_route)?;
    let entry = ROUTE_TABLE
        .iter()
        .find(|entry| entry.resource == resource && entry.method == request.method)
        .ok_or_else(bad_route)?;

    let product_id = match entry.resource {
        ResourcePath::Collection => None,
        ResourcePath::Item => Some(
            request
                .id_parameter
                .or(literal_id)
                .ok_or_else(bad_route)?
                .to_string(),
        ),
    };

    Ok(ResolvedRoute {
        operation: entry.operation,
        method: entry.method,
        product_id,
    })
}

fn match_literal_path(path: &str) -> Option<(ResourcePath, Option<&str>)> {
    if path == COLLECTION_RESOURCE {
        return Some((ResourcePath::Collection, None));
    }

    let id = path.strip_prefix(COLLECTION_RESOURCE)?.strip_prefix('/')?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some((ResourcePath::Item, Some(id)))
}
