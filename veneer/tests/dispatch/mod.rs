mod greeter;
mod hierarchy;
mod worker;
