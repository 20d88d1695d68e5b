//! Catalog domain module.
//!
//! Products, categories and time-bounded percentage discounts as the back-office
//! edits them. Everything here is deterministic domain logic (no IO, no storage);
//! price resolution lives in `atelier-pricing`.

pub mod category;
pub mod discount;
pub mod product;

pub use category::{
    Category, CategoryCommand, CategoryCreated, CategoryEvent, CategoryId, CategoryRemoved,
    CategoryRenamed, CreateCategory, RemoveCategory, RenameCategory,
};
pub use discount::{
    CreateDiscount, DeleteDiscount, Discount, DiscountCommand, DiscountCreated, DiscountDeleted,
    DiscountEvent, DiscountId, DiscountRevised, DiscountScope, DiscountStatus, ReviseDiscount,
};
pub use product::{
    ActivateProduct, ArchiveProduct, CreateProduct, Product, ProductActivated, ProductArchived,
    ProductCommand, ProductCreated, ProductEvent, ProductId, ProductRevised, ProductStatus,
    ReviseProduct,
};
