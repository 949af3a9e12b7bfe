//! Library entry for the planner binary and integration tests.
//! Exposes plugin modules and a prelude for common types.

pub mod plugins {
    pub mod camera;
    pub mod config;
    pub mod course;
    pub mod gating;
    pub mod geometry;
    pub mod gpu_tier;
    pub mod grid;
    pub mod layers;
    pub mod lod;
    pub mod materials;
    pub mod obstacles;
    pub mod opacity;
    pub mod perf_monitor;
    pub mod planner_state;
    pub mod post_fx;
    pub mod scene;
    pub mod storage;
}
pub mod prelude;
