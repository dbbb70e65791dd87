
mod cancel;
mod dispatch;
