pub mod ast;
pub mod convert;
pub mod dependency;
pub mod diags;
pub mod env;
pub mod error;
pub mod free_vars;
pub mod fresh;
pub mod inline;
pub mod partiality;
pub mod recursion;
pub mod scope;
pub mod sentence;
pub mod subst;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod dependency_tests;

use ast::{FuncDecl, Module, TypeDecl};
use convert::{ConvertOptions, Conversion};
use dependency::DependencyComponent;
use env::Environment;
use error::Result;
use log::debug;

// Re-export key types for the public API
pub use error::CompilerError;
pub use sentence::Sentence;

// =============================================================================
// Typestate Conversion Pipeline
// =============================================================================
//
// Each struct represents a stage. Methods consume `self` and return the next
// stage, enforcing valid ordering. The environment is shared by all stages
// and passed as &mut to the stages that need it:
//
//   let loaded = Compiler::load(module);
//     -> loaded.order()                                 -> Ordered
//       -> .register(&mut env)                          -> Registered
//         -> .analyze_partiality(&mut env)              -> Analyzed
//           -> .convert(&mut env, &options)             -> Conversion

/// Entry point for the pipeline. Use `Compiler::load()` to start.
pub struct Compiler;

impl Compiler {
    pub fn load(module: Module) -> Loaded {
        Loaded { module }
    }
}

/// A parsed module.
pub struct Loaded {
    pub module: Module,
}

impl Loaded {
    /// Split type and function declarations into dependency components.
    pub fn order(self) -> Ordered {
        let type_components = convert::order_type_decls(&self.module.type_decls);
        let func_components = convert::order_func_decls(&self.module.func_decls);
        debug!(
            "module {}: {} type component(s), {} function component(s)",
            self.module.name,
            type_components.len(),
            func_components.len()
        );
        Ordered {
            module: self.module,
            type_components,
            func_components,
        }
    }
}

/// Declarations have been ordered by their dependencies.
pub struct Ordered {
    pub module: Module,
    pub type_components: Vec<DependencyComponent<TypeDecl>>,
    pub func_components: Vec<DependencyComponent<FuncDecl>>,
}

impl Ordered {
    /// Register the functions and pragmas of the module.
    pub fn register(self, env: &mut Environment) -> Result<Registered> {
        convert::register_func_decls(env, &self.module.func_decls);
        convert::register_pragmas(env, &self.module)?;
        Ok(Registered { ordered: self })
    }
}

/// Functions and pragmas are known to the environment.
pub struct Registered {
    ordered: Ordered,
}

impl Registered {
    pub fn analyze_partiality(self, env: &mut Environment) -> Analyzed {
        partiality::analyze_partiality(env, &self.ordered.func_components);
        Analyzed { ordered: self.ordered }
    }
}

/// Every function is classified as partial or total.
pub struct Analyzed {
    ordered: Ordered,
}

impl Analyzed {
    /// Convert all type components, then all function components.
    pub fn convert(self, env: &mut Environment, options: &ConvertOptions) -> Result<Conversion> {
        let mut conversion = Conversion::default();
        convert::convert_components(
            env,
            &self.ordered.type_components,
            options,
            &mut conversion,
            convert::convert_type_component,
        )?;
        convert::convert_components(
            env,
            &self.ordered.func_components,
            options,
            &mut conversion,
            convert::convert_func_component,
        )?;
        debug!(
            "module {}: {} sentence(s), {} error(s)",
            self.ordered.module.name,
            conversion.sentences.len(),
            conversion.errors.len()
        );
        Ok(conversion)
    }
}

/// Run the whole pipeline on `module`.
pub fn convert_module(env: &mut Environment, module: Module, options: &ConvertOptions) -> Result<Conversion> {
    Compiler::load(module).order().register(env)?.analyze_partiality(env).convert(env, options)
}
