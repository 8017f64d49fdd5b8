pub mod force;
pub mod hierarchical;

#[derive(Debug, Clone)]
pub enum Algorithm {
    /// Layered drawing with edges flowing along `rankdir` (Graphviz `dot` stand-in).
    Hierarchical(HierarchicalOptions),
    /// Spring embedder honoring pinned nodes (Graphviz `neato` stand-in).
    ForceDirected(ForceOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDir {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl std::str::FromStr for RankDir {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(Self::TB),
            "BT" => Ok(Self::BT),
            "LR" => Ok(Self::LR),
            "RL" => Ok(Self::RL),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RankDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TB => "TB",
            Self::BT => "BT",
            Self::LR => "LR",
            Self::RL => "RL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct HierarchicalOptions {
    pub rankdir: RankDir,
    /// Minimum gap between neighboring nodes of the same rank.
    pub nodesep: f64,
    /// Minimum gap between consecutive ranks.
    pub ranksep: f64,
    /// Number of barycenter sweeps used to reduce crossings.
    pub order_iterations: usize,
}

impl Default for HierarchicalOptions {
    fn default() -> Self {
        Self {
            rankdir: RankDir::TB,
            nodesep: 50.0,
            ranksep: 50.0,
            order_iterations: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForceOptions {
    /// Seed for the initial placement of unpinned nodes.
    pub random_seed: u64,
    /// Target distance between adjacent node centers.
    pub ideal_edge_length: f64,
    pub iterations: usize,
}

impl Default for ForceOptions {
    fn default() -> Self {
        Self {
            random_seed: 0,
            ideal_edge_length: 100.0,
            iterations: 300,
        }
    }
}
