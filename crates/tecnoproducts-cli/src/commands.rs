use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::warn;

use tecnoproducts_core::auth::UnknownRoute;
use tecnoproducts_core::models::{Category, CategoryInput, Product, ProductInput, SaleInput, Supplier};
use tecnoproducts_core::{ApiError, App, LogoutOutcome, Route, RouteDecision, SessionError};

const ENV_USERNAME: &str = "TECNOPRODUCTS_USERNAME";
const ENV_PASSWORD: &str = "TECNOPRODUCTS_PASSWORD";

const LOGIN_HINT: &str = "Run `tecnoproducts login` to continue.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    Status,
    Refresh,
    Open { path: String },
    List(View),
    Edit(Edit),
}

/// Listings the panel can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Categories,
    Products,
    Sales,
    Suppliers,
}

impl View {
    /// The page this listing lives on; suppliers are shown with products
    pub fn route(&self) -> Route {
        match self {
            View::Categories => Route::Categories,
            View::Products | View::Suppliers => Route::Products,
            View::Sales => Route::Sales,
        }
    }
}

/// Changes made from the category, product and sale pages
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    AddCategory(CategoryInput),
    UpdateCategory(i64, CategoryInput),
    RemoveCategory(i64),
    AddProduct(ProductInput),
    UpdateProduct(i64, ProductInput),
    RemoveProduct(i64),
    AddSale { producto: i64, cantidad: i64 },
    RemoveSale(i64),
}

impl Edit {
    fn parse(resource: &str, args: &[String]) -> Option<Edit> {
        let (action, rest) = args.split_first()?;
        let edit = match (resource, action.as_str()) {
            ("category", "add") => Edit::AddCategory(category_input(rest)?),
            ("category", "edit") => {
                let (id, rest) = leading_id(rest)?;
                Edit::UpdateCategory(id, category_input(rest)?)
            }
            ("category", "rm") => Edit::RemoveCategory(only_id(rest)?),
            ("product", "add") => Edit::AddProduct(product_input(rest)?),
            ("product", "edit") => {
                let (id, rest) = leading_id(rest)?;
                Edit::UpdateProduct(id, product_input(rest)?)
            }
            ("product", "rm") => Edit::RemoveProduct(only_id(rest)?),
            ("sale", "add") => match rest {
                [producto, cantidad] => Edit::AddSale {
                    producto: producto.parse().ok()?,
                    cantidad: cantidad.parse().ok()?,
                },
                _ => return None,
            },
            ("sale", "rm") => Edit::RemoveSale(only_id(rest)?),
            _ => return None,
        };
        Some(edit)
    }

    /// The page the change is made from
    pub fn route(&self) -> Route {
        match self {
            Edit::AddCategory(_) | Edit::UpdateCategory(..) | Edit::RemoveCategory(_) => {
                Route::Categories
            }
            Edit::AddProduct(_) | Edit::UpdateProduct(..) | Edit::RemoveProduct(_) => Route::Products,
            Edit::AddSale { .. } | Edit::RemoveSale(_) => Route::Sales,
        }
    }

    /// Input problems caught before anything is sent
    fn validate(&self) -> Option<&'static str> {
        match self {
            Edit::AddCategory(input) | Edit::UpdateCategory(_, input) if !input.is_complete() => {
                Some("Name and description are required.")
            }
            Edit::AddProduct(input) | Edit::UpdateProduct(_, input) if input.nombre.trim().is_empty() => {
                Some("Product name is required.")
            }
            Edit::AddSale { cantidad, .. } if *cantidad <= 0 => Some("Quantity must be greater than 0."),
            _ => None,
        }
    }
}

fn leading_id(args: &[String]) -> Option<(i64, &[String])> {
    let (id, rest) = args.split_first()?;
    Some((id.parse().ok()?, rest))
}

fn only_id(args: &[String]) -> Option<i64> {
    match args {
        [id] => id.parse().ok(),
        _ => None,
    }
}

fn category_input(args: &[String]) -> Option<CategoryInput> {
    match args {
        [nombre, descripcion] => Some(CategoryInput {
            nombre: nombre.clone(),
            descripcion: descripcion.clone(),
        }),
        _ => None,
    }
}

/// `<nombre> <precio> <stock> [categoria] [proveedor]`; `-` leaves a link empty
fn product_input(args: &[String]) -> Option<ProductInput> {
    let [nombre, precio, stock, links @ ..] = args else {
        return None;
    };
    if links.len() > 2 {
        return None;
    }
    precio.parse::<f64>().ok()?;

    let link = |i: usize| -> Option<Option<i64>> {
        match links.get(i).map(String::as_str) {
            None | Some("-") => Some(None),
            Some(v) => v.parse().ok().map(Some),
        }
    };

    Some(ProductInput {
        nombre: nombre.clone(),
        precio: precio.clone(),
        stock: stock.parse().ok()?,
        categoria: link(0)?,
        proveedor: link(1)?,
    })
}

impl Command {
    pub fn parse(args: &[String]) -> Option<Command> {
        let (name, rest) = args.split_first()?;
        let command = match name.as_str() {
            "login" => Command::Login {
                username: rest.first().cloned(),
            },
            "logout" => Command::Logout,
            "status" => Command::Status,
            "refresh" => Command::Refresh,
            "open" => Command::Open {
                path: rest.first()?.clone(),
            },
            "categories" => Command::List(View::Categories),
            "products" => Command::List(View::Products),
            "sales" => Command::List(View::Sales),
            "suppliers" => Command::List(View::Suppliers),
            "category" | "product" | "sale" => Command::Edit(Edit::parse(name, rest)?),
            _ => return None,
        };
        Some(command)
    }
}

pub async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { username } => login(app, username).await,
        Command::Logout => logout(app),
        Command::Status => {
            status(app);
            Ok(())
        }
        Command::Refresh => refresh(app).await,
        Command::Open { path } => open(app, &path),
        Command::List(view) => list(app, view).await,
        Command::Edit(edit) => apply(app, &edit).await,
    }
}

// ============================================================================
// Session commands
// ============================================================================

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), default) {
        (true, Some(last)) => Ok(last.to_string()),
        _ => Ok(input.to_string()),
    }
}

async fn login(app: &mut App, username: Option<String>) -> Result<()> {
    if let RouteDecision::Redirect(to) = app.check(Route::Login) {
        println!("Already logged in. Continue at {}.", to);
        return Ok(());
    }

    let username = match username.or_else(|| std::env::var(ENV_USERNAME).ok()) {
        Some(u) => u,
        None => prompt_username(app.config.last_username.as_deref())?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(p) => p,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    match app.login(&username, &password).await {
        Ok(_) => {
            if let Err(e) = app.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Login successful.");
            Ok(())
        }
        // Rejected credentials and missing input are shown, not raised
        Err(e @ (SessionError::MissingCredentials | SessionError::Api(_))) => {
            eprintln!("{}", e.user_message());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn logout(app: &App) -> Result<()> {
    match app.logout()? {
        LogoutOutcome::SignedOut => println!("Logged out."),
        LogoutOutcome::AlreadySignedOut => {
            println!("You cannot log out without having logged in.")
        }
    }
    Ok(())
}

fn status(app: &App) {
    if app.is_authenticated() {
        println!("Logged in to {}", app.config.api_base_url);
    } else {
        println!("Not logged in ({}). {}", app.config.api_base_url, LOGIN_HINT);
    }
}

async fn refresh(app: &App) -> Result<()> {
    match app.refresh().await {
        Ok(_) => {
            println!("Access token renewed.");
            Ok(())
        }
        Err(e) if e.requires_login() => {
            eprintln!("{} {}", e.user_message(), LOGIN_HINT);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn open(app: &App, path: &str) -> Result<()> {
    match app.guard.navigate(path) {
        Ok(RouteDecision::Admit(route)) => println!("{}", route),
        Ok(RouteDecision::Redirect(to)) => println!("{} -> {}", path, to),
        Err(UnknownRoute(p)) => eprintln!("No page at {}", p),
    }
    Ok(())
}

// ============================================================================
// Protected listings
// ============================================================================

/// Per-view message for failures the user can act on; `None` for the rest.
fn failure_message(err: &SessionError) -> Option<String> {
    let api = err.api_error();
    if err.requires_login() || api.is_some_and(|e| e.is_unauthorized()) {
        return Some(format!("Not authorized. {}", LOGIN_HINT));
    }
    match (err, api) {
        (_, Some(e)) if e.is_transient() => Some(e.user_message()),
        (_, Some(e @ (ApiError::BadRequest { .. } | ApiError::AccessDenied(_) | ApiError::NotFound(_)))) => {
            Some(e.user_message())
        }
        (SessionError::SessionChanged, _) => Some(err.user_message()),
        _ => None,
    }
}

/// Print the message for failures the user can act on, propagate the rest.
fn report(err: SessionError) -> Result<()> {
    match failure_message(&err) {
        Some(message) => {
            eprintln!("{}", message);
            Ok(())
        }
        None => Err(err.into()),
    }
}

async fn list(app: &App, view: View) -> Result<()> {
    if let RouteDecision::Redirect(_) = app.check(view.route()) {
        eprintln!("You are not authenticated. {}", LOGIN_HINT);
        return Ok(());
    }

    let result = match view {
        View::Categories => list_categories(app).await,
        View::Products => list_products(app).await,
        View::Sales => list_sales(app).await,
        View::Suppliers => list_suppliers(app).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => report(e),
    }
}

async fn list_categories(app: &App) -> Result<(), SessionError> {
    let categories = app.call(|api| async move { api.list_categories().await }).await?;
    println!("{:<6} {:<30} {}", "ID", "NOMBRE", "DESCRIPCION");
    for c in &categories {
        println!("{:<6} {:<30} {}", c.id, c.nombre, c.descripcion);
    }
    Ok(())
}

async fn list_products(app: &App) -> Result<(), SessionError> {
    let (products, categories, suppliers): (Vec<Product>, Vec<Category>, Vec<Supplier>) =
        futures::try_join!(
            app.call(|api| async move { api.list_products().await }),
            app.call(|api| async move { api.list_categories().await }),
            app.call(|api| async move { api.list_suppliers().await }),
        )?;

    println!(
        "{:<6} {:<28} {:>10} {:>6} {:<20} {}",
        "ID", "NOMBRE", "PRECIO", "STOCK", "CATEGORIA", "PROVEEDOR"
    );
    for p in &products {
        println!(
            "{:<6} {:<28} {:>10} {:>6} {:<20} {}",
            p.id,
            p.nombre,
            p.precio,
            p.stock,
            p.category_name(&categories).unwrap_or("-"),
            p.supplier_name(&suppliers).unwrap_or("-"),
        );
    }
    Ok(())
}

async fn list_suppliers(app: &App) -> Result<(), SessionError> {
    let suppliers = app.call(|api| async move { api.list_suppliers().await }).await?;
    println!("{:<6} {}", "ID", "NOMBRE");
    for s in &suppliers {
        println!("{:<6} {}", s.id, s.nombre);
    }
    Ok(())
}

async fn list_sales(app: &App) -> Result<(), SessionError> {
    let (sales, products) = futures::try_join!(
        app.call(|api| async move { api.list_sales().await }),
        app.call(|api| async move { api.list_products().await }),
    )?;

    println!("{:<6} {:<28} {:>8} {:>10}", "ID", "PRODUCTO", "CANTIDAD", "TOTAL");
    for s in &sales {
        let product = s
            .product(&products)
            .map(|p| p.nombre.as_str())
            .unwrap_or("Product unavailable");
        println!("{:<6} {:<28} {:>8} {:>10}", s.id, product, s.cantidad, s.total);
    }
    Ok(())
}

// ============================================================================
// Protected edits
// ============================================================================

async fn apply(app: &App, edit: &Edit) -> Result<()> {
    if let RouteDecision::Redirect(_) = app.check(edit.route()) {
        eprintln!("You are not authenticated. {}", LOGIN_HINT);
        return Ok(());
    }
    if let Some(problem) = edit.validate() {
        eprintln!("{}", problem);
        return Ok(());
    }

    match apply_edit(app, edit).await {
        Ok(done) => {
            println!("{}", done);
            Ok(())
        }
        Err(e) => report(e),
    }
}

async fn apply_edit(app: &App, edit: &Edit) -> Result<String, SessionError> {
    match edit {
        Edit::AddCategory(input) => {
            let created = app.call(|api| async move { api.create_category(input).await }).await?;
            Ok(format!("Created category {} ({}).", created.id, created.nombre))
        }
        Edit::UpdateCategory(id, input) => {
            let id = *id;
            let updated = app
                .call(|api| async move { api.update_category(id, input).await })
                .await?;
            Ok(format!("Updated category {} ({}).", updated.id, updated.nombre))
        }
        Edit::RemoveCategory(id) => {
            let id = *id;
            app.call(|api| async move { api.delete_category(id).await }).await?;
            Ok(format!("Deleted category {}.", id))
        }
        Edit::AddProduct(input) => {
            let created = app.call(|api| async move { api.create_product(input).await }).await?;
            Ok(format!("Created product {} ({}).", created.id, created.nombre))
        }
        Edit::UpdateProduct(id, input) => {
            let id = *id;
            let updated = app
                .call(|api| async move { api.update_product(id, input).await })
                .await?;
            Ok(format!("Updated product {} ({}).", updated.id, updated.nombre))
        }
        Edit::RemoveProduct(id) => {
            let id = *id;
            app.call(|api| async move { api.delete_product(id).await }).await?;
            Ok(format!("Deleted product {}.", id))
        }
        Edit::AddSale { producto, cantidad } => {
            let products = app.call(|api| async move { api.list_products().await }).await?;
            let Some(product) = products.iter().find(|p| p.id == *producto) else {
                return Ok(format!("No product with id {}.", producto));
            };
            let Some(input) = SaleInput::for_product(product, *cantidad) else {
                return Ok(format!("Product {} has no usable price.", product.nombre));
            };

            let input = &input;
            let sale = app.call(|api| async move { api.create_sale(input).await }).await?;
            Ok(format!(
                "Recorded sale {}: {} x {} = {}.",
                sale.id, sale.cantidad, product.nombre, sale.total
            ))
        }
        Edit::RemoveSale(id) => {
            let id = *id;
            app.call(|api| async move { api.delete_sale(id).await }).await?;
            Ok(format!("Deleted sale {}.", id))
        }
    }
}
