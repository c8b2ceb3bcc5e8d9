use thiserror::Error;

use crate::domain::{
    entities::order::{Order, OrderItem, OrderLine},
    repositories::order::{OrderRepository, OrderRepositoryError},
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order has no line items")]
    EmptyOrder,
    #[error("line item quantity must be positive")]
    NonPositiveQuantity,
    #[error("order not found")]
    OrderNotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("repository error: {0}")]
    RepositoryError(#[from] OrderRepositoryError),
}

#[derive(Clone)]
pub struct OrderService<R>
where
    R: OrderRepository,
{
    repo: R,
}

impl<R> OrderService<R>
where
    R: OrderRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Places an order for `user_id`. All line-item stock decrements and the
    /// order row itself commit or roll back together.
    pub async fn place_order(
        &self,
        user_id: i64,
        items: &[OrderLine],
    ) -> Result<(Order, Vec<OrderItem>), OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if items.iter().any(|item| item.quantity <= 0) {
            return Err(OrderError::NonPositiveQuantity);
        }

        let order = self.repo.create_order(user_id, items).await?;
        let items = self.repo.get_order_items(order.id).await?;

        info!("order #{} placed by user {}", order.id, user_id);

        Ok((order, items))
    }

    /// Fetches one order. Customers only see their own orders; admins see
    /// everything.
    pub async fn fetch_order(
        &self,
        id: i64,
        requester_id: i64,
        requester_is_admin: bool,
    ) -> Result<(Order, Vec<OrderItem>), OrderError> {
        let order = self.repo.get_order(id).await.map_err(|e| match e {
            OrderRepositoryError::NotFound => OrderError::OrderNotFound,
            other => OrderError::RepositoryError(other),
        })?;

        if order.user_id != requester_id && !requester_is_admin {
            return Err(OrderError::Forbidden);
        }

        let items = self.repo.get_order_items(order.id).await?;

        Ok((order, items))
    }

    pub async fn fetch_orders_for(
        &self,
        requester_id: i64,
        requester_is_admin: bool,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = if requester_is_admin {
            self.repo.get_orders().await?
        } else {
            self.repo.get_orders_by_user(requester_id).await?
        };

        Ok(orders)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::infrastructure::database::test_support::{
        memory_pool, seed_product_with_stock, seed_user,
    };
    use crate::infrastructure::domain::repositories::order::OrderRepositoryImpl;

    #[tokio::test]
    async fn test_rejects_bad_line_items_before_touching_store() {
        let pool = memory_pool().await;
        let svc = OrderService::new(OrderRepositoryImpl::new(pool));

        let err = svc.place_order(1, &[]).await.unwrap_err();
        assert!(matches!(err, OrderError::EmptyOrder));

        let items = [OrderLine { product_id: 1, quantity: -2 }];
        let err = svc.place_order(1, &items).await.unwrap_err();
        assert!(matches!(err, OrderError::NonPositiveQuantity));
    }

    #[tokio::test]
    async fn test_customers_only_see_their_own_orders() {
        let pool = memory_pool().await;
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;
        seed_product_with_stock(&pool, 10, 5).await;
        let svc = OrderService::new(OrderRepositoryImpl::new(pool));

        let items = [OrderLine { product_id: 10, quantity: 1 }];
        let (order, _) = svc.place_order(1, &items).await.unwrap();

        let err = svc.fetch_order(order.id, 2, false).await.unwrap_err();
        assert!(matches!(err, OrderError::Forbidden));

        assert!(svc.fetch_order(order.id, 2, true).await.is_ok());
        assert!(svc.fetch_order(order.id, 1, false).await.is_ok());

        assert_eq!(svc.fetch_orders_for(2, false).await.unwrap().len(), 0);
        assert_eq!(svc.fetch_orders_for(2, true).await.unwrap().len(), 1);
    }
}
