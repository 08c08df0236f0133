use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub search: SearchStats,
    pub backbone: BackboneStats,
    pub components: ComponentStats,
}

#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    pub learnt_clauses: u64,
    pub restarts: u64,
    pub reductions: u64,
    pub searches: u64,
    pub solve_time: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct BackboneStats {
    pub calls: u64,
    pub probes: u64,
    pub forced: u64,
    pub mismatched_uip: u64,
    pub postponed: u64,
    pub models: u64,
    pub implied_binaries: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentStats {
    pub decompositions: u64,
    pub components: u64,
    pub free_vars: u64,
    pub var_orders: u64,
    pub abandoned_decompositions: u64,
}
