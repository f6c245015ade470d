pub(crate) mod serializable;
