use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::diary::{DiaryError, DiaryResult, FoodsCatalog};
use crate::models::{
    Food, FoodDetails, FoodId, LoggedItem, Nutrient, NutrientKey, NutritionMap, Portion,
};

pub struct FoodRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct FoodRow {
    id: i64,
    name: String,
    brand: Option<String>,
    is_recipe: bool,
    portion_amount: f64,
    portion_unit: String,
}

#[derive(sqlx::FromRow)]
struct NutrientRow {
    nutrient: String,
    amount: f64,
}

impl FoodRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, food: &Food) -> Result<Food, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO foods (name, brand, is_recipe, portion_amount, portion_unit)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&food.name)
        .bind(&food.brand)
        .bind(food.recipe)
        .bind(food.portion.amount)
        .bind(&food.portion.unit)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for nutrient in &food.nutrients {
            sqlx::query(
                "INSERT OR REPLACE INTO food_nutrients (food_id, nutrient, amount) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(nutrient.key.as_str())
            .bind(nutrient.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: FoodId) -> Result<Option<Food>, sqlx::Error> {
        let row: Option<FoodRow> = sqlx::query_as(
            "SELECT id, name, brand, is_recipe, portion_amount, portion_unit FROM foods WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate_food(row).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Food>, sqlx::Error> {
        let row: Option<FoodRow> = sqlx::query_as(
            "SELECT id, name, brand, is_recipe, portion_amount, portion_unit FROM foods WHERE LOWER(name) = LOWER(?) ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate_food(row).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<Food>, sqlx::Error> {
        let rows: Vec<FoodRow> = sqlx::query_as(
            "SELECT id, name, brand, is_recipe, portion_amount, portion_unit FROM foods ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut foods = Vec::with_capacity(rows.len());
        for row in rows {
            foods.push(self.hydrate_food(row).await?);
        }
        Ok(foods)
    }

    async fn hydrate_food(&self, row: FoodRow) -> Result<Food, sqlx::Error> {
        let nutrients: Vec<NutrientRow> = sqlx::query_as(
            "SELECT nutrient, amount FROM food_nutrients WHERE food_id = ? ORDER BY nutrient",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Food {
            id: row.id,
            name: row.name,
            brand: row.brand,
            recipe: row.is_recipe,
            portion: Portion::new(row.portion_amount, row.portion_unit),
            nutrients: nutrients
                .into_iter()
                .map(|n| Nutrient::new(NutrientKey::from_name(&n.nutrient), n.amount))
                .collect(),
        })
    }

    async fn lookup(&self, id: FoodId) -> DiaryResult<Food> {
        self.get_by_id(id)
            .await
            .map_err(|e| DiaryError::Catalog(e.to_string()))?
            .ok_or(DiaryError::UnknownFood(id))
    }
}

#[async_trait]
impl FoodsCatalog for FoodRepository {
    async fn get_food(&self, id: FoodId) -> DiaryResult<FoodDetails> {
        Ok(self.lookup(id).await?.details())
    }

    async fn get_nutrition(&self, item: &LoggedItem) -> DiaryResult<NutritionMap> {
        self.lookup(item.id)
            .await?
            .nutrition_for(&item.portion, item.quantity)
            .map_err(DiaryError::InvalidArgument)
    }
}
