pub mod books;

use bookshelf_db::Pool;
use bookshelf_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, pool: Pool) -> anyhow::Result<()> {
    registry.register(books::create_module(pool))?;
    Ok(())
}
