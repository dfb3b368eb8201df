use std::fmt;

pub type VertexId = i64;

/// A directed, labelled edge. Edges are stored with their source vertex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub label: String,
}

impl Edge {
    pub fn new(source: VertexId, target: VertexId, label: impl Into<String>) -> Self {
        Edge {
            source,
            target,
            label: label.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Int(i64),
    Str(String),
    Path(Vec<Element>),
}

/// Payload carried by a traverser.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Vertex(VertexId),
    Edge(Edge),
    Value(Value),
}

impl Element {
    /// The vertex that owns this element in a vertex-partitioned graph.
    /// Edges live with their source vertex; plain values have no home and
    /// stay wherever they were produced.
    pub fn host(&self) -> Option<VertexId> {
        match self {
            Element::Vertex(id) => Some(*id),
            Element::Edge(edge) => Some(edge.source),
            Element::Value(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Element::Vertex(_) => "vertex",
            Element::Edge(_) => "edge",
            Element::Value(_) => "value",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Vertex(id) => write!(f, "v[{}]", id),
            Element::Edge(edge) => {
                write!(f, "e[{}-{}->{}]", edge.source, edge.label, edge.target)
            }
            Element::Value(value) => write!(f, "{}", value),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::Path(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
        }
    }
}
