//! Compiler context: registry, optimizer and compile cache in one object.

use common_error::SparkResult;
use once_cell::sync::Lazy;
use shellspark_optimizer::Optimizer;
use shellspark_plan::QueryPlan;
use shellspark_tools::{ToolConfig, ToolRegistry};
use tracing::debug;

use crate::assemble::Assembler;
use crate::cache::{CacheKey, CompileCache};

static GLOBAL: Lazy<Compiler> = Lazy::new(Compiler::default);

/// Everything a compilation needs, passed explicitly instead of hiding in
/// module-level state. A process-wide default instance is available through
/// [`Compiler::global`] for convenience.
pub struct Compiler {
    registry: ToolRegistry,
    optimizer: Optimizer,
    cache: CompileCache,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(ToolConfig::from_env())
    }
}

impl Compiler {
    /// Create a compiler whose registry uses the given configuration.
    pub fn new(config: ToolConfig) -> Self {
        Self::with_registry(ToolRegistry::new(config))
    }

    /// Create a compiler over an existing registry.
    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self {
            registry,
            optimizer: Optimizer::default(),
            cache: CompileCache::default(),
        }
    }

    /// The process-wide default compiler.
    pub fn global() -> &'static Compiler {
        &GLOBAL
    }

    /// The tool registry backing this compiler.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Compile a plan into a shell command.
    ///
    /// Results are memoized under both the as-built and the optimized plan
    /// hash together with the tool fingerprint; a hit skips optimization
    /// and emission entirely.
    pub fn compile(&self, plan: &QueryPlan) -> SparkResult<String> {
        let fingerprint = self.registry.fingerprint();
        let built_key = CacheKey {
            plan_hash: plan.structural_hash(),
            fingerprint: fingerprint.clone(),
        };
        if let Some(command) = self.cache.get(&built_key) {
            debug!(plan_hash = built_key.plan_hash, "compile cache hit");
            return Ok(command);
        }

        let optimized = self.optimizer.optimize(plan.clone())?;
        let optimized_key = CacheKey {
            plan_hash: optimized.structural_hash(),
            fingerprint,
        };
        if let Some(command) = self.cache.get(&optimized_key) {
            self.cache.insert(built_key, command.clone());
            return Ok(command);
        }

        let command = Assembler::new(&self.registry).assemble(&optimized)?;
        debug!(command = %command, "compiled plan");
        self.cache.insert(optimized_key.clone(), command.clone());
        if built_key != optimized_key {
            self.cache.insert(built_key, command.clone());
        }
        Ok(command)
    }

    /// Drop every cached compilation.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached compilations.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellspark_plan::{LineMatch, PlanBuilder, Predicate};
    use shellspark_tools::{
        AwkTool, AwkVariant, GrepTool, GrepVariant, JqTool, ResolvedTools, SortTool,
    };
    use std::path::PathBuf;

    fn compiler() -> Compiler {
        Compiler::with_registry(ToolRegistry::from_resolved(
            ToolConfig::default(),
            ResolvedTools {
                awk: Some(AwkTool {
                    path: PathBuf::from("awk"),
                    variant: AwkVariant::Mawk,
                }),
                grep: Some(GrepTool {
                    path: PathBuf::from("grep"),
                    variant: GrepVariant::Grep,
                    supports_fixed_strings: true,
                    supports_extended_regex: true,
                }),
                sort: Some(SortTool {
                    path: PathBuf::from("sort"),
                    supports_parallel: false,
                    supports_buffer_size: false,
                }),
                jq: Some(JqTool {
                    path: PathBuf::from("jq"),
                }),
                cpus: 2,
            },
        ))
    }

    fn plan(pattern: &str) -> QueryPlan {
        PlanBuilder::source("app.log")
            .filter(Predicate::line(LineMatch::Contains, pattern))
            .build()
            .unwrap()
    }

    #[test]
    fn test_compile_hits_cache_second_time() {
        let compiler = compiler();
        let first = compiler.compile(&plan("ERROR")).unwrap();
        assert_eq!(first, "grep -F 'ERROR' app.log");
        let cached_before = compiler.cache_len();

        let second = compiler.compile(&plan("ERROR")).unwrap();
        assert_eq!(first, second);
        assert_eq!(compiler.cache_len(), cached_before);
    }

    #[test]
    fn test_clear_cache_recompiles_identically() {
        let compiler = compiler();
        let first = compiler.compile(&plan("WARN")).unwrap();
        compiler.clear_cache();
        assert_eq!(compiler.cache_len(), 0);
        let second = compiler.compile(&plan("WARN")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_compilations_are_not_cached() {
        use shellspark_plan::{SortOp, Workers};

        let compiler = compiler();
        let bad = PlanBuilder::source("logs/*.json")
            .parse_json()
            .sort(SortOp::asc("status"))
            .parallel(Workers::Auto)
            .build()
            .unwrap();

        assert!(compiler.compile(&bad).is_err());
        assert_eq!(compiler.cache_len(), 0);
    }
}
